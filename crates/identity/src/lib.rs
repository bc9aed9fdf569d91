//! Identity model: companies, users and the internal team directory.
//!
//! Pure domain records and their validated inputs. No IO, no storage.

pub mod company;
pub mod team;
pub mod user;

pub use company::Company;
pub use team::{TeamMember, TeamMemberInput};
pub use user::{NewUser, RegisterUser, User, UserDraft, UserPatch, ValidatedPatch};
