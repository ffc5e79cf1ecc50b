//! Dependency resolution
//!
//! The [Resolver] walks the fields of a record and fills every vacant injectable field
//! from the registry, creating missing records on the fly (depth first).
//!
//! The resolver never locks anything: it is handed the registry by the [crate::Injector]
//! while the registry lock is held, so that providers synthesized during the walk are
//! registered in the same critical section as the lookups.

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::config::{CommitPolicy, Config};
use crate::marker::{self, MarkerError};
use crate::reflect::{Field, Record, Target, TypeInfo};
use crate::registry::{Key, Provider, Registry};

/// Errors triggered during the autowiring process
#[derive(Error, Debug)]
pub enum WiringError {
    #[error("unnamed provider must hold a record, got {type_name}")]
    InvalidProviderShape { type_name: &'static str },
    #[error("injection target must be a record, got {type_name}")]
    InvalidTargetShape { type_name: &'static str },
    #[error("field {field} in {record} has type {field_type}, which is neither provided nor a record")]
    InvalidFieldShape {
        field: &'static str,
        record: &'static str,
        field_type: &'static str,
    },
    #[error("inject requested on unexported field {field} in {record}")]
    UnexportedInjectTarget {
        field: &'static str,
        record: &'static str,
    },
    #[error("no provider named {name} for field {field} in {record}")]
    MissingNamedDependency {
        name: String,
        field: &'static str,
        record: &'static str,
    },
    #[error("provider {name} of type {provider_type} is not assignable to field {field} ({field_type}) in {record}")]
    TypeMismatch {
        name: String,
        provider_type: &'static str,
        field: &'static str,
        field_type: &'static str,
        record: &'static str,
    },
    #[error("no provider assignable to {interface} for field {field} in {record}")]
    MissingAssignableDependency {
        interface: &'static str,
        field: &'static str,
        record: &'static str,
    },
    #[error("found two providers assignable to field {field} in {record}: {first} and {second}")]
    AmbiguousAssignableDependency {
        field: &'static str,
        record: &'static str,
        first: &'static str,
        second: &'static str,
    },
    #[error("malformed marker `{marker}` for field {field} in {record}: {source}")]
    MalformedInjectionMarker {
        marker: &'static str,
        field: &'static str,
        record: &'static str,
        #[source]
        source: MarkerError,
    },
    #[error("cyclic dependencies: {chain}")]
    CyclicDependency { chain: String },
}

/// Broad classification of [WiringError]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A record was required but something else was supplied
    Shape,
    /// Missing, ambiguous, incompatible or cyclic dependency
    Resolution,
    /// Injection requested on a field that cannot be assigned
    Access,
    /// Malformed injection marker
    MarkerSyntax,
}

impl WiringError {
    pub fn class(&self) -> ErrorClass {
        match self {
            WiringError::InvalidProviderShape { .. }
            | WiringError::InvalidTargetShape { .. }
            | WiringError::InvalidFieldShape { .. } => ErrorClass::Shape,
            WiringError::MissingNamedDependency { .. }
            | WiringError::TypeMismatch { .. }
            | WiringError::MissingAssignableDependency { .. }
            | WiringError::AmbiguousAssignableDependency { .. }
            | WiringError::CyclicDependency { .. } => ErrorClass::Resolution,
            WiringError::UnexportedInjectTarget { .. } => ErrorClass::Access,
            WiringError::MalformedInjectionMarker { .. } => ErrorClass::MarkerSyntax,
        }
    }
}

enum Origin {
    /// Requested by the caller
    Explicit,
    /// Created to fill a nested field
    Synthesized { embedded: bool },
}

/// Lock-free resolution worker, valid for a single resolution pass
pub(crate) struct Resolver<'r> {
    registry: &'r mut Registry,
    config: &'r Config,
    /// Keys registered during this pass
    journal: Vec<Key>,
    /// Records under construction, outermost first
    chain: Vec<TypeInfo>,
}

impl<'r> Resolver<'r> {
    pub(crate) fn new(registry: &'r mut Registry, config: &'r Config) -> Self {
        Self {
            registry,
            config,
            journal: Vec::new(),
            chain: Vec::new(),
        }
    }

    /// Run a resolution pass.
    ///
    /// With the transactional policy, a failed pass leaves no provider behind.
    pub(crate) fn transaction<T>(
        mut self,
        work: impl FnOnce(&mut Self) -> Result<T, WiringError>,
    ) -> Result<T, WiringError> {
        let outcome = work(&mut self);
        if let Err(err) = &outcome {
            if self.config.commit == CommitPolicy::Transactional && !self.journal.is_empty() {
                warn!(
                    providers = self.journal.len(),
                    error = %err,
                    "resolution failed, discarding synthesized providers"
                );
                self.registry.rollback(&self.journal);
            }
        }
        outcome
    }

    /// Obtain the provider for a record type, building it if needed
    pub(crate) fn resolve_type(&mut self, info: TypeInfo) -> Result<Provider, WiringError> {
        if let Some(existing) = self.registry.lookup_by_type(info.id()) {
            return Ok(existing.clone());
        }
        let record = info
            .record_info()
            .ok_or(WiringError::InvalidTargetShape {
                type_name: info.name(),
            })?;
        self.build(record.zero(), Origin::Explicit)
    }

    /// Obtain the provider for the type of a caller-built record.
    ///
    /// The seed becomes the provider if none exists yet, otherwise it is dropped.
    pub(crate) fn resolve_seed(&mut self, seed: Box<dyn Record>) -> Result<Provider, WiringError> {
        let info = seed.describe();
        if let Some(existing) = self.registry.lookup_by_type(info.id()) {
            debug!(record = info.name(), "provider exists, ignoring seed");
            return Ok(existing.clone());
        }
        self.build(seed, Origin::Explicit)
    }

    fn build(
        &mut self,
        mut record: Box<dyn Record>,
        origin: Origin,
    ) -> Result<Provider, WiringError> {
        let info = record.describe();
        self.enter(info)?;
        let populated = self.populate(record.as_mut());
        self.chain.pop();
        populated?;

        let provider = match origin {
            Origin::Explicit => Provider::unnamed(record.into_shared(), info),
            Origin::Synthesized { embedded } => {
                Provider::synthesized(record.into_shared(), info, embedded)
            }
        };
        if self.registry.provide(provider.clone())? {
            self.journal.push(provider.key().clone());
        }
        debug!(
            record = info.name(),
            synthesized = provider.is_synthesized(),
            "registered provider"
        );
        Ok(provider)
    }

    fn enter(&mut self, info: TypeInfo) -> Result<(), WiringError> {
        if self.config.detect_cycles && self.chain.contains(&info) {
            let chain = self
                .chain
                .iter()
                .chain(std::iter::once(&info))
                .map(TypeInfo::name)
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(WiringError::CyclicDependency { chain });
        }
        self.chain.push(info);
        Ok(())
    }

    fn populate(&mut self, record: &mut dyn Record) -> Result<(), WiringError> {
        let owner = record.describe();
        for field in record.fields() {
            self.populate_field(owner, field)?;
        }
        Ok(())
    }

    fn populate_field(&mut self, owner: TypeInfo, field: Field<'_>) -> Result<(), WiringError> {
        let name = field.name();
        let embedded = field.is_embedded();
        let Some(mut injection) = field.into_injection() else {
            return Ok(());
        };

        let raw = injection.marker();
        let marker = marker::parse(raw).map_err(|source| WiringError::MalformedInjectionMarker {
            marker: raw.text(),
            field: name,
            record: owner.name(),
            source,
        })?;

        let settable = injection.is_settable();
        let slot = injection.slot();
        if !slot.is_vacant() {
            trace!(record = owner.name(), field = name, "already populated");
            return Ok(());
        }
        if !settable {
            return Err(WiringError::UnexportedInjectTarget {
                field: name,
                record: owner.name(),
            });
        }
        let target = slot.target();

        let provider = match (marker.name(), target) {
            (Some(provider_name), _) => self.named(owner, name, provider_name, &target)?,
            (None, Target::Interface { .. }) => self.assignable(owner, name, &target)?,
            (None, Target::Concrete(info)) => self.concrete(owner, name, info, embedded)?,
        };

        if !slot.assign(&provider) {
            return Err(WiringError::TypeMismatch {
                name: provider.name().unwrap_or_default().to_string(),
                provider_type: provider.type_info().name(),
                field: name,
                field_type: target.name(),
                record: owner.name(),
            });
        }
        trace!(
            record = owner.name(),
            field = name,
            provider = provider.type_info().name(),
            "injected"
        );
        Ok(())
    }

    fn named(
        &self,
        owner: TypeInfo,
        field: &'static str,
        name: &str,
        target: &Target,
    ) -> Result<Provider, WiringError> {
        let provider = self.registry.lookup_by_name(name).ok_or_else(|| {
            WiringError::MissingNamedDependency {
                name: name.to_string(),
                field,
                record: owner.name(),
            }
        })?;
        if !provider.type_info().assignable_to(target) {
            return Err(WiringError::TypeMismatch {
                name: name.to_string(),
                provider_type: provider.type_info().name(),
                field,
                field_type: target.name(),
                record: owner.name(),
            });
        }
        Ok(provider.clone())
    }

    fn assignable(
        &self,
        owner: TypeInfo,
        field: &'static str,
        target: &Target,
    ) -> Result<Provider, WiringError> {
        let mut candidates: Vec<&Provider> = self
            .registry
            .typed()
            .filter(|p| p.type_info().assignable_to(target))
            .collect();
        candidates.sort_by_key(|p| p.type_info().name());

        match candidates.as_slice() {
            [] => Err(WiringError::MissingAssignableDependency {
                interface: target.name(),
                field,
                record: owner.name(),
            }),
            [only] => Ok((*only).clone()),
            [first, second, ..] => Err(WiringError::AmbiguousAssignableDependency {
                field,
                record: owner.name(),
                first: first.type_info().name(),
                second: second.type_info().name(),
            }),
        }
    }

    fn concrete(
        &mut self,
        owner: TypeInfo,
        field: &'static str,
        info: TypeInfo,
        embedded: bool,
    ) -> Result<Provider, WiringError> {
        if let Some(existing) = self.registry.lookup_by_type(info.id()) {
            return Ok(existing.clone());
        }
        let Some(record) = info.record_info() else {
            return Err(WiringError::InvalidFieldShape {
                field,
                record: owner.name(),
                field_type: info.name(),
            });
        };
        debug!(
            record = owner.name(),
            field,
            dependency = info.name(),
            "synthesizing missing dependency"
        );
        self.build(record.zero(), Origin::Synthesized { embedded })
    }
}
