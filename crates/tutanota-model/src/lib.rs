//! Entity metadata and wire-shape handling for the Tutanota REST protocol.
//!
//! Requests and responses are keyed by numeric attribute id, not by field
//! name. The [`TypeModel`] registry tabulates, per entity type, every
//! attribute's id, scalar type and encryption flag, plus the three owner
//! attributes that drive session-key resolution. The [`wire`] module
//! translates between numeric and named shapes and owns the
//! single-element-array tolerance the wire demands.

mod error;
mod ids;
mod registry;
mod type_model;
pub mod wire;

pub use error::ModelError;
pub use ids::IdTuple;
pub use registry::{
    CREATE_SESSION_DATA, CREATE_SESSION_RETURN, CUSTOMER, GROUP, GROUP_KEY, GROUP_KEYS_REF,
    GROUP_MEMBERSHIP, MAIL, MAILBOX_GROUP_ROOT, MAIL_BOX, MAIL_SET, MAIL_SET_ENTRY, MAIL_SET_REF,
    SALT_DATA, SALT_RETURN, SYS_VERSION, TUTANOTA_VERSION, USER, type_model_by_name,
};
pub use type_model::{AssociationKind, ModelAssociation, ModelValue, TypeModel, ValueType};
