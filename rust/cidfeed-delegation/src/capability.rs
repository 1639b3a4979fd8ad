use crate::DelegationError;
use serde::{Deserialize, Serialize};

/// A single permission: an `action` that may be performed on a `resource`.
///
/// Resources are typically identity ids (a feed is addressed by its owner),
/// actions are slash separated paths such as `feed/publish`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "CapabilityWire")]
pub struct Capability {
    resource: String,
    action: String,
}

#[derive(Deserialize)]
struct CapabilityWire {
    resource: String,
    action: String,
}

impl TryFrom<CapabilityWire> for Capability {
    type Error = DelegationError;

    fn try_from(wire: CapabilityWire) -> Result<Self, Self::Error> {
        Capability::new(wire.resource, wire.action)
    }
}

impl Capability {
    /// Creates a capability, trimming surrounding whitespace from both parts.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::InvalidCapability`] if either part is empty
    /// after trimming.
    pub fn new(
        resource: impl AsRef<str>,
        action: impl AsRef<str>,
    ) -> Result<Self, DelegationError> {
        let resource = resource.as_ref().trim();
        let action = action.as_ref().trim();
        if resource.is_empty() || action.is_empty() {
            return Err(DelegationError::InvalidCapability);
        }
        Ok(Self {
            resource: resource.to_owned(),
            action: action.to_owned(),
        })
    }

    /// Getter for the `resource` field.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Getter for the `action` field.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }
}
