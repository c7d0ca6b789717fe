//! Components: a header/control record pair owning child associations.
//!
//! Attributes assigned to a component are kept in one map. When a header,
//! control or child is built, the component hands over the attributes that
//! belong to that schema, so a file's `company_name` reaches every batch
//! header created under it.

use crate::association::{Association, AssociationSpec};
use crate::error::{AchError, Result};
use crate::formatter::FieldRuleRegistry;
use crate::record::{Attributes, FieldDefault, FieldMap, FieldValue, Record, RecordSchema};
use log::debug;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Something that can be held by an association: a plain record or a nested
/// component.
pub trait Member: Sized + 'static {
    /// Static description of the member type.
    type Schema: Copy + 'static;

    /// Resolves `name` to the interned field name if any schema reachable
    /// from this member declares it.
    fn field_name(schema: Self::Schema, name: &str) -> Option<&'static str>;

    /// Builds a member from resolved values.
    fn assemble(schema: Self::Schema, values: FieldMap) -> Result<Self>;

    /// Fixed-width lines of the member, in output order.
    fn lines(&self, rules: &FieldRuleRegistry) -> Result<Vec<String>>;
}

impl Member for Record {
    type Schema = &'static RecordSchema;

    fn field_name(schema: Self::Schema, name: &str) -> Option<&'static str> {
        schema.field(name)
    }

    fn assemble(schema: Self::Schema, values: FieldMap) -> Result<Self> {
        Ok(Record::from_values(schema, values))
    }

    fn lines(&self, rules: &FieldRuleRegistry) -> Result<Vec<String>> {
        Ok(vec![self.render_with(rules)?])
    }
}

/// Computes a field from the component's current children, if it is a
/// derived field of that component kind.
pub type DeriveFn<M> = fn(&Component<M>, &str) -> Result<Option<FieldValue>>;

/// Static description of a component type.
pub struct ComponentKind<M: Member> {
    pub name: &'static str,
    pub header: &'static RecordSchema,
    pub control: &'static RecordSchema,
    pub associations: &'static [AssociationSpec<M>],
    pub derive: DeriveFn<M>,
}

/// Where an attribute assigned to a component ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Field of the component's own header or control record.
    Own,
    /// Field of a schema reachable through the named association.
    Delegate(&'static str),
}

impl<M: Member> ComponentKind<M> {
    /// Looks up where an attribute name is routed.
    pub fn route(&self, name: &str) -> Option<(&'static str, Route)> {
        if let Some(field) = self.header.field(name).or_else(|| self.control.field(name)) {
            return Some((field, Route::Own));
        }
        self.associations.iter().find_map(|spec| {
            M::field_name(spec.member, name).map(|field| (field, Route::Delegate(spec.name)))
        })
    }

    /// Interned spelling of `name` if it is reachable from this kind.
    pub fn field_name(&self, name: &str) -> Option<&'static str> {
        self.route(name).map(|(field, _)| field)
    }
}

impl<M: Member> fmt::Debug for ComponentKind<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentKind")
            .field("name", &self.name)
            .field("header", &self.header.name)
            .field("control", &self.control.name)
            .finish()
    }
}

/// Identity of a component instance, used to bind associations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId {
    kind: &'static str,
    serial: u64,
}

impl OwnerId {
    fn next(kind: &'static str) -> Self {
        static SERIAL: AtomicU64 = AtomicU64::new(1);
        OwnerId {
            kind,
            serial: SERIAL.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.serial)
    }
}

/// A header/control pair with attributes and owned associations.
pub struct Component<M: Member> {
    kind: &'static ComponentKind<M>,
    owner: OwnerId,
    attributes: FieldMap,
    /// Generated schema defaults, evaluated once when the component is made.
    generated: FieldMap,
    header: Option<Record>,
    control: Option<Record>,
    associations: Vec<Association<M>>,
}

impl<M: Member> Component<M> {
    /// Creates a component, rejecting attributes no schema in its tree declares.
    pub fn new(kind: &'static ComponentKind<M>, attributes: Attributes) -> Result<Self> {
        let values = attributes.resolve(kind.name, |name| kind.field_name(name))?;
        Component::from_values(kind, values)
    }

    pub(crate) fn from_values(kind: &'static ComponentKind<M>, attributes: FieldMap) -> Result<Self> {
        let owner = OwnerId::next(kind.name);
        let associations = kind
            .associations
            .iter()
            .map(|spec| Association::prototype(spec).for_owner(owner))
            .collect::<Result<Vec<_>>>()?;
        let generated = [kind.header, kind.control]
            .iter()
            .flat_map(|schema| schema.defaults.iter())
            .filter_map(|(field, default)| match default {
                FieldDefault::Generated(generate) => Some((*field, generate())),
                _ => None,
            })
            .collect();

        Ok(Component {
            kind,
            owner,
            attributes,
            generated,
            header: None,
            control: None,
            associations,
        })
    }

    pub fn kind(&self) -> &'static ComponentKind<M> {
        self.kind
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Component-level attributes, including those inherited from the owner.
    pub fn attributes(&self) -> &FieldMap {
        &self.attributes
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.attributes.get(name)
    }

    /// Assigns one attribute.
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<()> {
        let field = self
            .kind
            .field_name(name)
            .ok_or_else(|| AchError::UnknownAttribute {
                name: name.to_string(),
                component: self.kind.name,
            })?;
        self.attributes.insert(field, value.into());
        Ok(())
    }

    /// Assigns several attributes; nothing is assigned if any name is unknown.
    pub fn assign(&mut self, attributes: Attributes) -> Result<()> {
        let kind = self.kind;
        let values = attributes.resolve(kind.name, |name| kind.field_name(name))?;
        self.attributes.extend(values);
        Ok(())
    }

    /// Values for a record schema: explicit attributes first, then derived
    /// fields, then the generated defaults captured at construction.
    fn fields_for(&self, schema: &'static RecordSchema) -> Result<FieldMap> {
        let mut values = FieldMap::new();
        for &field in schema.fields {
            if let Some(value) = self.attributes.get(field) {
                values.insert(field, value.clone());
            } else if let Some(value) = (self.kind.derive)(self, field)? {
                values.insert(field, value);
            } else if let Some(value) = self.generated.get(field) {
                values.insert(field, value.clone());
            }
        }
        Ok(values)
    }

    /// The header record: the stored one if set or parsed, otherwise built
    /// from the current attributes.
    pub fn header(&self) -> Result<Record> {
        match &self.header {
            Some(header) => Ok(header.clone()),
            None => Ok(Record::from_values(
                self.kind.header,
                self.fields_for(self.kind.header)?,
            )),
        }
    }

    /// The header record if one was parsed or set with
    /// [`Component::set_header`].
    pub fn stored_header(&self) -> Option<&Record> {
        self.header.as_ref()
    }

    /// The control record, stored or built like [`Component::header`].
    pub fn control(&self) -> Result<Record> {
        match &self.control {
            Some(control) => Ok(control.clone()),
            None => Ok(Record::from_values(
                self.kind.control,
                self.fields_for(self.kind.control)?,
            )),
        }
    }

    /// Builds the header from the current attributes with `overrides` on
    /// top and stores it.
    pub fn set_header(&mut self, overrides: Attributes) -> Result<&mut Record> {
        let schema = self.kind.header;
        let mut values = self.fields_for(schema)?;
        values.extend(overrides.resolve(schema.name, |name| schema.field(name))?);
        Ok(self.header.insert(Record::from_values(schema, values)))
    }

    /// Parses and stores the header record.
    pub fn build_header(&mut self, line: &str) -> Result<&mut Record> {
        let record = Record::from_line(self.kind.header, line)?;
        Ok(self.header.insert(record))
    }

    /// Parses and stores the control record.
    pub fn build_control(&mut self, line: &str) -> Result<&mut Record> {
        let record = Record::from_line(self.kind.control, line)?;
        Ok(self.control.insert(record))
    }

    fn association_index(&self, name: &str) -> Result<usize> {
        self.associations
            .iter()
            .position(|association| association.name() == name)
            .ok_or_else(|| AchError::UnknownAssociation {
                name: name.to_string(),
                component: self.kind.name,
            })
    }

    pub fn association(&self, name: &str) -> Result<&Association<M>> {
        let index = self.association_index(name)?;
        Ok(&self.associations[index])
    }

    pub fn associations(&self) -> &[Association<M>] {
        &self.associations
    }

    /// Members of a flat association; empty if the name is unknown or linked.
    pub(crate) fn members(&self, name: &str) -> &[M] {
        self.association(name)
            .map_or(&[][..], |association| association.members())
    }

    /// Index of the linking record a new child of `spec` attaches to.
    fn link_for(&self, spec: &AssociationSpec<M>) -> Result<Option<usize>> {
        let Some(link_name) = spec.linked_to else {
            return Ok(None);
        };
        let link = self.association(link_name)?;
        link.last_index()
            .map(Some)
            .ok_or(AchError::NoLink {
                link: link.singular(),
                child: spec.singular,
            })
    }

    /// Creates a child in the named association.
    ///
    /// Values are merged as: owner attributes relevant to the child, then the
    /// association's computed defaults, then `attributes`.
    pub fn create(&mut self, association: &str, attributes: Attributes) -> Result<&mut M> {
        self.create_with(association, attributes, |_| Ok(()))
    }

    /// Like [`Component::create`], running `configure` on the child before it
    /// is appended.
    pub fn create_with<F>(
        &mut self,
        association: &str,
        attributes: Attributes,
        configure: F,
    ) -> Result<&mut M>
    where
        F: FnOnce(&mut M) -> Result<()>,
    {
        let index = self.association_index(association)?;
        let spec = self.associations[index].spec();
        let link = self.link_for(spec)?;

        let mut values: FieldMap = self
            .attributes
            .iter()
            .filter_map(|(name, value)| {
                M::field_name(spec.member, name).map(|field| (field, value.clone()))
            })
            .collect();
        if let Some(defaults) = spec.defaults {
            values.extend(defaults(self)?);
        }
        values.extend(attributes.resolve(spec.singular, |name| M::field_name(spec.member, name))?);

        let mut member = M::assemble(spec.member, values)?;
        configure(&mut member)?;

        debug!(
            "{}: created {} #{}",
            self.owner,
            spec.singular,
            self.associations[index].len() + 1
        );
        self.associations[index].push(link, member)
    }

    /// Ordered lines: header, each unlinked member followed by the members
    /// linked to it, control.
    pub fn lines(&self, rules: &FieldRuleRegistry) -> Result<Vec<String>> {
        let mut lines = vec![self.header()?.render_with(rules)?];

        for association in self.associations.iter().filter(|a| a.linked_to().is_none()) {
            for (index, member) in association.members().iter().enumerate() {
                lines.extend(member.lines(rules)?);
                for linked in self
                    .associations
                    .iter()
                    .filter(|a| a.linked_to() == Some(association.name()))
                {
                    for child in linked.attached_to(index) {
                        lines.extend(child.lines(rules)?);
                    }
                }
            }
        }

        lines.push(self.control()?.render_with(rules)?);
        Ok(lines)
    }
}

impl Component<Record> {
    /// Parses a raw line into the named association's record type and
    /// appends it.
    pub fn build_member(&mut self, association: &str, line: &str) -> Result<&mut Record> {
        let index = self.association_index(association)?;
        let spec = self.associations[index].spec();
        let link = self.link_for(spec)?;
        let record = Record::from_line(spec.member, line)?;
        self.associations[index].push(link, record)
    }
}

impl<M: Member + fmt::Debug> fmt::Debug for Component<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("kind", &self.kind.name)
            .field("owner", &self.owner)
            .field("attributes", &self.attributes)
            .field("header", &self.header)
            .field("control", &self.control)
            .field("associations", &self.associations)
            .finish()
    }
}
