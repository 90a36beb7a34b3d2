//! sea-orm entities for the LineTime database.

pub mod event_images;
pub mod events;
pub mod space_members;
pub mod spaces;
pub mod users;
