use crate::models::{Actor, Product};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ViewAny,
    View,
    Create,
    Update,
    Delete,
    Restore,
    ForceDelete,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ViewAny => "view-any",
            Capability::View => "view",
            Capability::Create => "create",
            Capability::Update => "update",
            Capability::Delete => "delete",
            Capability::Restore => "restore",
            Capability::ForceDelete => "force-delete",
        }
    }
}

/// Decides whether an actor may perform a capability, optionally against a
/// specific product.
pub trait Authorizer: Send + Sync {
    fn can(&self, actor: &Actor, capability: Capability, product: Option<&Product>) -> bool;
}

/// Anyone signed in may look at products. Changing them takes the admin role.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductPolicy;

impl Authorizer for ProductPolicy {
    fn can(&self, actor: &Actor, capability: Capability, _product: Option<&Product>) -> bool {
        match capability {
            Capability::ViewAny | Capability::View => true,
            Capability::Create
            | Capability::Update
            | Capability::Delete
            | Capability::Restore
            | Capability::ForceDelete => actor.is_admin(),
        }
    }
}
