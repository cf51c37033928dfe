//! Blog-shaped sample models: nested composition and collections.

use buildframe_derive::Buildable;

#[derive(Buildable, Debug, Clone)]
pub struct Profile {
    pub display_name: String,
    pub bio: Option<String>,
    pub links: Vec<String>,
}

#[derive(Buildable, Debug, Clone)]
pub struct Author {
    pub handle: String,
    pub profile: Profile,
}

#[derive(Buildable, Debug, Clone)]
#[buildable(name = "PostComposer")]
pub struct Post {
    pub title: String,
    #[buildable(default)]
    pub draft: bool,
    pub tags: Vec<String>,
    pub author: Author,
    pub summary: Option<String>,
}
