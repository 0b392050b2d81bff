pub mod config;
pub mod coordinator;
pub mod error;
pub mod message;
pub mod node;
pub mod subscription;
pub mod telemetry;
pub mod validation;

use std::any::{Any, TypeId};
use std::fmt;

/// A helper trait that just provides the `as_any` family of methods.
/// Needed for downcasting messages handed out by an inbox and for the
/// producer-type check the coordinator runs at wiring time.
///
/// Careful with boxes: `Box<dyn Message>` is itself `'static`, so calling
/// `boxed.as_any()` resolves to the box's own impl. Deref first (`(*boxed).as_any()`).
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T: Send + 'static> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// Runtime identity of a concrete type, used for the message-type and
/// producer-type constraints on a subscription.
#[derive(Debug, Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: short_type_name(std::any::type_name::<T>()),
        }
    }

    pub(crate) fn from_parts(id: TypeId, name: &'static str) -> Self {
        Self {
            id,
            name: short_type_name(name),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Strips the module path from a `std::any::type_name` string.
/// `relay::core::node::tests::Camera` becomes `Camera`; generic arguments are dropped.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Joins type tags as `A | B | C` for error messages.
pub(crate) fn describe_tags(tags: &[TypeTag]) -> String {
    tags.iter().map(|t| t.name()).collect::<Vec<_>>().join(" | ")
}
