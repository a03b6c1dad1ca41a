pub mod frontmatter;
pub mod icons;
pub mod inbox;
pub mod pagination;
pub mod timeago;
