pub mod post;
pub mod profile;
pub mod reel;
pub mod relation;
pub mod story;
pub mod subject;

// 重新导出常用类型
pub use post::Post;
pub use profile::Profile;
pub use reel::Reel;
pub use relation::{RelationKey, RelationKind, RelationRow, RelationSnapshot, Toggleable};
pub use story::{MediaType, Story};
pub use subject::{Subject, SubjectId};
