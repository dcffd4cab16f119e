use std::any::type_name;
use std::fmt;

use crate::bits::Bits;
use crate::component::Component;
use crate::registry::{ComponentManager, ComponentTypeId};

#[derive(Clone, Copy)]
struct ComponentKey {
    name: &'static str,
    register: fn(&mut ComponentManager) -> ComponentTypeId,
}

impl ComponentKey {
    fn of<T: Component>() -> Self {
        Self {
            name: type_name::<T>(),
            register: ComponentManager::register::<T>,
        }
    }
}

/// Declarative membership predicate for a system.
///
/// An entity matches when its composition has every `all` type, at least
/// one `one` type (if any are named), and no `exclude` type.
///
/// ```ignore
/// let aspect = Aspect::new().all::<Position>().exclude::<Frozen>();
/// ```
#[derive(Clone, Default)]
pub struct Aspect {
    all: Vec<ComponentKey>,
    one: Vec<ComponentKey>,
    exclude: Vec<ComponentKey>,
    empty: bool,
}

impl Aspect {
    /// The universal aspect: matches every entity.
    pub fn new() -> Self {
        Self::default()
    }

    /// An aspect that matches nothing. Useful for systems that only do
    /// per-tick work.
    pub fn empty() -> Self {
        Self {
            empty: true,
            ..Self::default()
        }
    }

    /// Require `T`.
    pub fn all<T: Component>(mut self) -> Self {
        self.all.push(ComponentKey::of::<T>());
        self
    }

    /// Require at least one of the types named through `one`.
    pub fn one<T: Component>(mut self) -> Self {
        self.one.push(ComponentKey::of::<T>());
        self
    }

    /// Reject entities holding `T`.
    pub fn exclude<T: Component>(mut self) -> Self {
        self.exclude.push(ComponentKey::of::<T>());
        self
    }

    /// Returns true if this aspect matches nothing.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Turn type keys into bit masks, registering types on first sight.
    pub(crate) fn resolve(&self, components: &mut ComponentManager) -> AspectBits {
        let mut resolve = |keys: &[ComponentKey]| -> Bits {
            keys.iter()
                .map(|key| (key.register)(components).index())
                .collect()
        };
        AspectBits {
            all: resolve(&self.all),
            one: resolve(&self.one),
            exclude: resolve(&self.exclude),
            empty: self.empty,
        }
    }
}

impl fmt::Debug for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |keys: &[ComponentKey]| keys.iter().map(|k| k.name).collect::<Vec<_>>();
        f.debug_struct("Aspect")
            .field("all", &names(&self.all))
            .field("one", &names(&self.one))
            .field("exclude", &names(&self.exclude))
            .field("empty", &self.empty)
            .finish()
    }
}

/// An [`Aspect`] resolved against a world's type registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AspectBits {
    all: Bits,
    one: Bits,
    exclude: Bits,
    empty: bool,
}

impl AspectBits {
    /// Build directly from masks.
    pub fn new(all: Bits, one: Bits, exclude: Bits) -> Self {
        Self {
            all,
            one,
            exclude,
            empty: false,
        }
    }

    /// Evaluate the predicate against a composition mask.
    pub fn matches(&self, bits: &Bits) -> bool {
        if self.empty {
            return false;
        }
        self.all.is_subset(bits)
            && (self.one.is_empty() || self.one.intersects(bits))
            && !self.exclude.intersects(bits)
    }

    /// Required types.
    pub fn all(&self) -> &Bits {
        &self.all
    }

    /// Types of which at least one is required.
    pub fn one(&self) -> &Bits {
        &self.one
    }

    /// Rejected types.
    pub fn exclude(&self) -> &Bits {
        &self.exclude
    }
}
