pub mod batch;
pub mod concept;
pub mod mentor;
pub mod organization;
pub mod pod;
pub mod role;
pub mod user;

pub use batch::{Batch, BatchSummary};
pub use concept::Concept;
pub use mentor::Mentor;
pub use organization::Organization;
pub use pod::{Pod, PodSummary};
pub use role::Role;
pub use user::{CreatedAccount, PodMember, UserAccount, UserProfile};
