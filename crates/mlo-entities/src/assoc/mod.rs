pub mod candidates;
pub mod resolver;

pub use candidates::{plan_setup, Candidate, SetupPair};
pub use resolver::{all_affiliated_aps, next_affiliated_ap, AffiliatedApRef};
