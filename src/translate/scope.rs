//! Identifier bindings for one translation.
//!
//! Bindings live in an arena for the whole translation and are addressed by their generated
//! identifier. Dependency and scope-frame links are identifiers too, never references.

use std::collections::{BTreeMap, HashMap};

use crate::pgsql::{
    DataType, FromClause, Identifier, IdentifierSet, TableReference, Value, TABLE_EDGE,
    TABLE_NODE,
};

use super::errors::TranslationError;

#[derive(Debug, Clone, PartialEq)]
pub struct BoundIdentifier {
    pub identifier: Identifier,
    /// Source-language name this binding is reachable by.
    pub alias: Option<String>,
    /// Caller-supplied value of a parameter binding.
    pub parameter: Option<Value>,
    pub data_type: DataType,
    pub dependencies: Vec<Identifier>,
    /// The CTE whose columns currently carry this binding.
    pub scope_binding: Option<Identifier>,
    pub provision: Option<TableReference>,
}

impl BoundIdentifier {
    fn new(identifier: Identifier, data_type: DataType) -> Self {
        BoundIdentifier {
            identifier,
            alias: None,
            parameter: None,
            data_type,
            dependencies: Vec::new(),
            scope_binding: None,
            provision: None,
        }
    }

    pub fn is_materialized(&self) -> bool {
        self.scope_binding.is_some()
    }
}

/// Per-type monotonic name generator: `n0`, `n1`, `e0`, `ex0`, `@p0`, ...
#[derive(Debug, Clone, Default)]
pub struct IdentifierGenerator {
    counters: HashMap<&'static str, usize>,
}

impl IdentifierGenerator {
    fn prefix(data_type: DataType) -> Option<&'static str> {
        match data_type {
            DataType::NodeComposite
            | DataType::ExpansionRootNode
            | DataType::ExpansionTerminalNode => Some("n"),
            DataType::EdgeComposite | DataType::ExpansionEdge => Some("e"),
            DataType::ExpansionPattern => Some("ex"),
            DataType::PathComposite | DataType::ExpansionPath => Some("p"),
            DataType::NodeUpdateResult => Some("un"),
            DataType::EdgeUpdateResult => Some("eu"),
            DataType::ParameterIdentifier => Some("@p"),
            _ => None,
        }
    }

    pub fn next(&mut self, data_type: DataType) -> Result<Identifier, TranslationError> {
        let prefix = Self::prefix(data_type)
            .ok_or(TranslationError::UnsupportedIdentifierType { data_type })?;

        let counter = self.counters.entry(prefix).or_insert(0);
        let identifier = Identifier::new(format!("{}{}", prefix, counter));
        *counter += 1;

        Ok(identifier)
    }
}

#[derive(Debug, Clone, Default)]
struct Level {
    visible: IdentifierSet,
    isolated: bool,
}

#[derive(Debug, Clone)]
pub struct Scope {
    bindings: HashMap<Identifier, BoundIdentifier>,
    aliases: HashMap<String, Identifier>,
    generator: IdentifierGenerator,
    levels: Vec<Level>,
    frame: Option<Identifier>,
}

impl Default for Scope {
    fn default() -> Self {
        Scope {
            bindings: HashMap::new(),
            aliases: HashMap::new(),
            generator: IdentifierGenerator::default(),
            levels: vec![Level::default()],
            frame: None,
        }
    }
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Binding
    // ========================================================================

    /// Generates a fresh identifier for `data_type` and binds it.
    pub fn define_new(&mut self, data_type: DataType) -> Result<Identifier, TranslationError> {
        let identifier = self.generator.next(data_type)?;
        self.bind(identifier.clone(), data_type);

        log::trace!("defined {} as {}", identifier, data_type);
        Ok(identifier)
    }

    pub fn bind(&mut self, identifier: Identifier, data_type: DataType) {
        self.bindings
            .entry(identifier.clone())
            .or_insert_with(|| BoundIdentifier::new(identifier, data_type));
    }

    /// Makes `identifier` reachable by the source-language name `alias`.
    pub fn alias(
        &mut self,
        alias: impl Into<String>,
        identifier: &Identifier,
    ) -> Result<(), TranslationError> {
        let alias = alias.into();
        let binding = self.lookup_mut(identifier)?;
        binding.alias = Some(alias.clone());

        self.aliases.insert(alias, identifier.clone());
        Ok(())
    }

    pub fn set_parameter(
        &mut self,
        identifier: &Identifier,
        value: Value,
    ) -> Result<(), TranslationError> {
        self.lookup_mut(identifier)?.parameter = Some(value);
        Ok(())
    }

    pub fn add_dependency(
        &mut self,
        identifier: &Identifier,
        dependency: &Identifier,
    ) -> Result<(), TranslationError> {
        // bindings only ever depend on earlier bindings
        self.lookup(dependency)?;

        let binding = self.lookup_mut(identifier)?;
        if !binding.dependencies.contains(dependency) {
            binding.dependencies.push(dependency.clone());
        }
        Ok(())
    }

    pub fn retype(
        &mut self,
        identifier: &Identifier,
        data_type: DataType,
    ) -> Result<(), TranslationError> {
        let binding = self.lookup_mut(identifier)?;
        log::trace!("retyped {} from {} to {}", identifier, binding.data_type, data_type);

        binding.data_type = data_type;
        Ok(())
    }

    /// Marks a bound identifier visible at the current level and clears its provision.
    /// Returns false when the identifier was never bound.
    pub fn declare(&mut self, identifier: &Identifier) -> bool {
        let Some(binding) = self.bindings.get_mut(identifier) else {
            return false;
        };
        binding.provision = None;

        if let Some(level) = self.levels.last_mut() {
            level.visible.add(identifier.clone());
        }
        true
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn lookup(&self, identifier: &Identifier) -> Result<&BoundIdentifier, TranslationError> {
        self.bindings
            .get(identifier)
            .ok_or_else(|| TranslationError::unknown_identifier(identifier))
    }

    fn lookup_mut(
        &mut self,
        identifier: &Identifier,
    ) -> Result<&mut BoundIdentifier, TranslationError> {
        self.bindings
            .get_mut(identifier)
            .ok_or_else(|| TranslationError::unknown_identifier(identifier))
    }

    /// Resolves a source-language name through the alias table, then the binding table.
    pub fn lookup_alias(&self, name: &str) -> Result<&BoundIdentifier, TranslationError> {
        match self.aliases.get(name) {
            Some(identifier) => self.lookup(identifier),
            None => self.lookup(&Identifier::from(name)),
        }
    }

    pub fn is_aliased(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    // ========================================================================
    // Visibility
    // ========================================================================

    pub fn visible(&self) -> IdentifierSet {
        self.levels
            .last()
            .map(|level| level.visible.clone())
            .unwrap_or_default()
    }

    pub fn is_visible(&self, identifier: &Identifier) -> bool {
        self.levels
            .last()
            .is_some_and(|level| level.visible.contains(identifier))
    }

    /// Opens a child level that shares what it resolves with its parent on `ascend`.
    pub fn descend(&mut self) {
        self.push_level(false);
    }

    /// Opens a child level that starts from a snapshot of the visible set; whatever it resolves
    /// is discarded on `ascend`.
    pub fn isolate(&mut self) {
        self.push_level(true);
    }

    fn push_level(&mut self, isolated: bool) {
        let visible = self.visible();
        self.levels.push(Level { visible, isolated });
    }

    /// Closes the current level. The root level is never closed.
    pub fn ascend(&mut self) {
        if self.levels.len() < 2 {
            return;
        }

        if let Some(level) = self.levels.pop() {
            if !level.isolated {
                if let Some(parent) = self.levels.last_mut() {
                    parent.visible.add_set(&level.visible);
                }
            }
        }
    }

    // ========================================================================
    // Frames
    // ========================================================================

    /// The CTE the most recent lowering step projected into.
    pub fn frame(&self) -> Option<&Identifier> {
        self.frame.as_ref()
    }

    pub fn is_materialized(&self, identifier: &Identifier) -> bool {
        self.bindings
            .get(identifier)
            .is_some_and(BoundIdentifier::is_materialized)
    }

    /// Visible bindings that already live in the current frame.
    pub fn materialized(&self) -> IdentifierSet {
        self.visible()
            .iter()
            .filter(|identifier| self.is_materialized(identifier))
            .cloned()
            .collect()
    }

    /// Moves `projected` into the CTE `frame` and makes it the current frame.
    pub fn set_frame(
        &mut self,
        frame: &Identifier,
        projected: &[Identifier],
    ) -> Result<(), TranslationError> {
        for identifier in projected {
            self.lookup_mut(identifier)?.scope_binding = Some(frame.clone());
        }

        log::debug!("scope frame is now {}", frame);
        self.frame = Some(frame.clone());
        Ok(())
    }

    // ========================================================================
    // Relations
    // ========================================================================

    /// Builds the from clause each binding reads its columns from and records it as the
    /// binding's provision. Paths aggregate other bindings and contribute nothing.
    pub fn build_from_clauses(
        &mut self,
        identifiers: &[Identifier],
    ) -> Result<Vec<FromClause>, TranslationError> {
        let mut clauses = Vec::with_capacity(identifiers.len());

        for identifier in identifiers {
            let binding = self.lookup_mut(identifier)?;

            let reference = match binding.data_type {
                DataType::NodeComposite
                | DataType::ExpansionRootNode
                | DataType::ExpansionTerminalNode => {
                    TableReference::bound(TABLE_NODE, identifier)
                }
                DataType::EdgeComposite | DataType::ExpansionEdge => {
                    TableReference::bound(TABLE_EDGE, identifier)
                }
                DataType::ExpansionPattern => TableReference::named(identifier),
                DataType::PathComposite | DataType::ExpansionPath => continue,
                data_type => {
                    return Err(TranslationError::UnsupportedFromClauseType {
                        identifier: identifier.to_string(),
                        data_type,
                    })
                }
            };

            binding.provision = Some(reference.clone());
            clauses.push(FromClause::new(reference));
        }

        Ok(clauses)
    }

    /// Caller-supplied parameter values keyed by their generated identifiers.
    pub fn parameters(&self) -> BTreeMap<String, Value> {
        self.bindings
            .values()
            .filter_map(|binding| {
                binding
                    .parameter
                    .as_ref()
                    .map(|value| (binding.identifier.to_string(), value.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pgsql::format::ToSql;
    use crate::pgsql::{Expression, Query, Select};

    #[test]
    fn test_generator_counts_per_prefix() {
        let mut scope = Scope::new();

        assert_eq!(scope.define_new(DataType::NodeComposite).unwrap().as_str(), "n0");
        assert_eq!(scope.define_new(DataType::EdgeComposite).unwrap().as_str(), "e0");
        assert_eq!(scope.define_new(DataType::ExpansionTerminalNode).unwrap().as_str(), "n1");
        assert_eq!(scope.define_new(DataType::ExpansionPattern).unwrap().as_str(), "ex0");
        assert_eq!(
            scope.define_new(DataType::ParameterIdentifier).unwrap().as_str(),
            "@p0"
        );
        assert!(matches!(
            scope.define_new(DataType::Int8),
            Err(TranslationError::UnsupportedIdentifierType { .. })
        ));
    }

    #[test]
    fn test_alias_lookup() {
        let mut scope = Scope::new();
        let node = scope.define_new(DataType::NodeComposite).unwrap();
        scope.alias("a", &node).unwrap();

        assert_eq!(scope.lookup_alias("a").unwrap().identifier, node);
        assert_eq!(scope.lookup_alias("n0").unwrap().identifier, node);
        assert_eq!(
            scope.lookup_alias("b"),
            Err(TranslationError::UnknownIdentifier {
                identifier: "b".to_string()
            })
        );
    }

    #[test]
    fn test_declare_requires_binding() {
        let mut scope = Scope::new();
        assert!(!scope.declare(&Identifier::from("n9")));

        let node = scope.define_new(DataType::NodeComposite).unwrap();
        assert!(!scope.is_visible(&node));
        assert!(scope.declare(&node));
        assert!(scope.is_visible(&node));
    }

    #[test]
    fn test_descend_inherits_and_ascend_shares() {
        let mut scope = Scope::new();
        let a = scope.define_new(DataType::NodeComposite).unwrap();
        let b = scope.define_new(DataType::NodeComposite).unwrap();

        scope.descend();
        scope.declare(&a);
        scope.ascend();
        assert!(scope.is_visible(&a));

        scope.descend();
        assert!(scope.is_visible(&a));
        scope.declare(&b);
        scope.ascend();
        assert!(scope.is_visible(&b));

        // the root level is never closed
        scope.ascend();
        assert!(scope.is_visible(&a));
    }

    #[test]
    fn test_isolate_discards_its_resolutions() {
        let mut scope = Scope::new();
        let a = scope.define_new(DataType::NodeComposite).unwrap();
        let b = scope.define_new(DataType::NodeComposite).unwrap();
        scope.declare(&a);

        scope.isolate();
        assert!(scope.is_visible(&a));
        scope.declare(&b);
        assert!(scope.is_visible(&b));
        scope.ascend();

        assert!(scope.is_visible(&a));
        assert!(!scope.is_visible(&b));
    }

    #[test]
    fn test_build_from_clauses() {
        let mut scope = Scope::new();
        let node = scope.define_new(DataType::NodeComposite).unwrap();
        let edge = scope.define_new(DataType::ExpansionEdge).unwrap();
        let path = scope.define_new(DataType::PathComposite).unwrap();
        let parameter = scope.define_new(DataType::ParameterIdentifier).unwrap();

        let clauses = scope
            .build_from_clauses(&[node.clone(), edge, path])
            .unwrap();
        assert_eq!(clauses.len(), 2);
        assert!(scope.lookup(&node).unwrap().provision.is_some());

        let query = Query::new(Select {
            projection: vec![Expression::literal(1i64)],
            from: clauses,
            ..Default::default()
        });
        assert_eq!(query.to_sql().unwrap(), "select 1 from node n0, edge e0");

        assert!(matches!(
            scope.build_from_clauses(&[parameter]),
            Err(TranslationError::UnsupportedFromClauseType { .. })
        ));
    }

    #[test]
    fn test_set_frame_materializes_bindings() {
        let mut scope = Scope::new();
        let a = scope.define_new(DataType::NodeComposite).unwrap();
        let b = scope.define_new(DataType::NodeComposite).unwrap();
        scope.declare(&a);
        scope.declare(&b);

        scope.set_frame(&a, &[a.clone()]).unwrap();

        assert_eq!(scope.frame(), Some(&a));
        assert_eq!(scope.materialized().to_vec(), vec![a.clone()]);
        assert_eq!(scope.lookup(&a).unwrap().scope_binding, Some(a));
        assert!(!scope.is_materialized(&b));
    }

    #[test]
    fn test_parameters() {
        let mut scope = Scope::new();
        let parameter = scope.define_new(DataType::ParameterIdentifier).unwrap();
        scope.set_parameter(&parameter, Value::from(5i64)).unwrap();
        scope.define_new(DataType::ParameterIdentifier).unwrap();

        let parameters = scope.parameters();
        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters.get("@p0"), Some(&Value::Int8(5)));
    }
}
