//! Owned child collections of a component.
//!
//! An association is declared once as a static [`AssociationSpec`]. Every
//! component instance gets its own [`Association`], cloned from an unbound
//! prototype with [`Association::for_owner`]; a bound association can never
//! be bound again.
//!
//! A *linked* association attaches each new child to the most recent record
//! of a sibling association:
//!
//! ```
//! use ach_engine::{Attributes, Batch};
//!
//! let mut batch = Batch::new(Attributes::new()).unwrap();
//! batch.entry(Attributes::new().with("amount", 100)).unwrap();
//! batch.addenda(Attributes::new().with("payment_related_info", "FOO")).unwrap();
//! batch.entry(Attributes::new().with("amount", 200)).unwrap();
//! batch.addenda(Attributes::new().with("payment_related_info", "BAR")).unwrap();
//! batch.addenda(Attributes::new().with("payment_related_info", "BAZ")).unwrap();
//!
//! assert_eq!(batch.entries().len(), 2);
//! assert_eq!(batch.addendas_for(0).len(), 1);
//! assert_eq!(batch.addendas_for(1).len(), 2);
//! ```

use crate::component::{Component, Member, OwnerId};
use crate::error::{AchError, Result};
use crate::record::FieldMap;
use std::collections::BTreeMap;
use std::fmt;

/// Computes association-level defaults for a new child from its owner.
pub type DefaultsFn<M> = fn(&Component<M>) -> Result<FieldMap>;

/// Static declaration of an association.
pub struct AssociationSpec<M: Member> {
    /// Plural name, e.g. `"entries"`.
    pub name: &'static str,
    /// Singular name used in error messages, e.g. `"entry"`.
    pub singular: &'static str,
    /// Schema of the child type.
    pub member: M::Schema,
    /// Sibling association whose latest record each child attaches to.
    pub linked_to: Option<&'static str>,
    pub defaults: Option<DefaultsFn<M>>,
}

impl<M: Member> fmt::Debug for AssociationSpec<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssociationSpec")
            .field("name", &self.name)
            .field("linked_to", &self.linked_to)
            .finish()
    }
}

enum Container<M> {
    /// Children in creation order.
    Flat(Vec<M>),
    /// Children keyed by the index of the linking record they attach to.
    Linked(BTreeMap<usize, Vec<M>>),
}

impl<M> Container<M> {
    fn empty(linked: bool) -> Self {
        if linked {
            Container::Linked(BTreeMap::new())
        } else {
            Container::Flat(Vec::new())
        }
    }
}

/// One association owned by one component.
pub struct Association<M: Member> {
    spec: &'static AssociationSpec<M>,
    owner: Option<OwnerId>,
    container: Container<M>,
}

impl<M: Member> Association<M> {
    /// An unbound association, usable only as a template for
    /// [`Association::for_owner`].
    pub fn prototype(spec: &'static AssociationSpec<M>) -> Self {
        Association {
            spec,
            owner: None,
            container: Container::empty(spec.linked_to.is_some()),
        }
    }

    /// Clones this prototype and binds the clone to `owner`.
    ///
    /// Fails with `DoubleAssignment` if `self` is already bound.
    pub fn for_owner(&self, owner: OwnerId) -> Result<Self> {
        if let Some(bound) = self.owner {
            return Err(AchError::DoubleAssignment {
                association: self.spec.name,
                owner: bound.to_string(),
            });
        }
        Ok(Association {
            spec: self.spec,
            owner: Some(owner),
            container: Container::empty(self.spec.linked_to.is_some()),
        })
    }

    pub fn spec(&self) -> &'static AssociationSpec<M> {
        self.spec
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn singular(&self) -> &'static str {
        self.spec.singular
    }

    pub fn linked_to(&self) -> Option<&'static str> {
        self.spec.linked_to
    }

    pub fn owner(&self) -> Option<OwnerId> {
        self.owner
    }

    /// Number of children, across all links for a linked association.
    pub fn len(&self) -> usize {
        match &self.container {
            Container::Flat(members) => members.len(),
            Container::Linked(buckets) => buckets.values().map(Vec::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Children of a flat association in creation order. Empty for linked
    /// associations; use [`Association::attached_to`] for those.
    pub fn members(&self) -> &[M] {
        match &self.container {
            Container::Flat(members) => members,
            Container::Linked(_) => &[],
        }
    }

    /// Index of the most recently created child of a flat association.
    pub fn last_index(&self) -> Option<usize> {
        self.members().len().checked_sub(1)
    }

    pub fn last(&self) -> Option<&M> {
        self.members().last()
    }

    /// Children attached to the linking record at `link`.
    pub fn attached_to(&self, link: usize) -> &[M] {
        match &self.container {
            Container::Linked(buckets) => buckets.get(&link).map_or(&[][..], Vec::as_slice),
            Container::Flat(_) => &[],
        }
    }

    /// Every child, in link order for linked associations.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &M> + '_> {
        match &self.container {
            Container::Flat(members) => Box::new(members.iter()),
            Container::Linked(buckets) => Box::new(buckets.values().flatten()),
        }
    }

    /// Appends a child to the container resolved for `link`.
    pub(crate) fn push(&mut self, link: Option<usize>, member: M) -> Result<&mut M> {
        let spec = self.spec;
        let members = match (&mut self.container, link) {
            (Container::Flat(members), _) => members,
            (Container::Linked(buckets), Some(link)) => buckets.entry(link).or_default(),
            (Container::Linked(_), None) => {
                return Err(AchError::NoLink {
                    link: spec.linked_to.unwrap_or("record"),
                    child: spec.singular,
                })
            }
        };
        members.push(member);
        let last = members.len() - 1;
        Ok(&mut members[last])
    }
}

impl<M: Member + fmt::Debug> fmt::Debug for Association<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Association");
        s.field("name", &self.spec.name).field("owner", &self.owner);
        match &self.container {
            Container::Flat(members) => s.field("members", members),
            Container::Linked(buckets) => s.field("linked", buckets),
        };
        s.finish()
    }
}
