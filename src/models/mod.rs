//! Domain models for the clan community API.

pub mod profile;
pub mod user;

// Re-export commonly used types
pub use profile::{
    MemberListResponse, MembersQuery, Profile, ProfilePatch, ProfileRole, ProfileSource,
    ProfileUpdateResponse, ProfileView, RoleUpdateRequest, RoleUpdateResponse, RowStatus,
};
pub use user::{AccessClaims, Session, UserMetadata};

/// Upper bound on any member listing.
pub const MEMBER_PAGE_LIMIT: usize = 20;
