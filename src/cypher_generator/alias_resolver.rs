//! Alias resolution for translating logical table/column references to
//! compiled pattern variables.
//!
//! The primary entity always compiles to the reserved base alias; each join
//! entry is assigned one sequential alias at first reference and memoized
//! for the life of the query state. Undefined references do not fail
//! compilation; they silently bind to the base entity. The permissive
//! policy is deliberate and covered by tests.

/// Reserved pattern variable for the un-joined target entity
pub const BASE_ALIAS: &str = "n";

/// Prefix for generated join aliases (`j1`, `j2`, ...)
const JOIN_ALIAS_PREFIX: &str = "j";

/// Scope marker for correlated subqueries: inner compilations reference the
/// enclosing entity through this token, which is rewritten to the enclosing
/// alias after the subquery text is produced.
pub const OUTER_MARKER: &str = "__outer__";

/// Split a `"table AS alias"` expression on a case-insensitive separator.
/// No separator yields `(expr, None)`. ASCII-only folding keeps the found
/// offset valid as a byte index into the original expression.
pub fn parse_name(expr: &str) -> (String, Option<String>) {
    let lower = expr.to_ascii_lowercase();
    if let Some(pos) = lower.find(" as ") {
        let base = expr[..pos].trim().to_string();
        let alias = expr[pos + 4..].trim().to_string();
        if !base.is_empty() && !alias.is_empty() {
            return (base, Some(alias));
        }
    }
    (expr.trim().to_string(), None)
}

#[derive(Debug, Clone)]
struct JoinAlias {
    base: String,
    declared: Option<String>,
    compiled: String,
}

#[derive(Debug, Clone)]
pub struct AliasResolver {
    base_alias: String,
    join_prefix: String,
    primary_name: String,
    primary_alias: Option<String>,
    joins: Vec<JoinAlias>,
    counter: u32,
}

impl AliasResolver {
    pub fn new(primary_expr: &str) -> Self {
        Self::with_base_alias(primary_expr, BASE_ALIAS)
    }

    /// Subquery compilations use their own base alias so inner variables
    /// never collide with (or rebind) the enclosing pattern's variables.
    /// Join aliases inherit the base as a prefix for the same reason.
    pub fn with_base_alias(primary_expr: &str, base_alias: &str) -> Self {
        let (primary_name, primary_alias) = parse_name(primary_expr);
        let join_prefix = if base_alias == BASE_ALIAS {
            JOIN_ALIAS_PREFIX.to_string()
        } else {
            format!("{}{}", base_alias, JOIN_ALIAS_PREFIX)
        };
        Self {
            base_alias: base_alias.to_string(),
            join_prefix,
            primary_name,
            primary_alias,
            joins: Vec::new(),
            counter: 0,
        }
    }

    pub fn base_alias(&self) -> &str {
        &self.base_alias
    }

    pub fn primary_name(&self) -> &str {
        &self.primary_name
    }

    /// Assign the next sequential alias to a join target and memoize it.
    /// Called once per join entry, in declaration order.
    pub fn register_join(&mut self, target_expr: &str) -> String {
        let (base, declared) = parse_name(target_expr);
        self.counter += 1;
        let compiled = format!("{}{}", self.join_prefix, self.counter);
        log::debug!("assigned join alias {} to {}", compiled, base);
        self.joins.push(JoinAlias {
            base,
            declared,
            compiled: compiled.clone(),
        });
        compiled
    }

    /// Resolve a logical table reference to its compiled alias.
    ///
    /// Declared join aliases win over base entity names; anything still
    /// unresolved falls back to the base alias.
    pub fn resolve(&self, table: &str) -> &str {
        if table == self.primary_name {
            return &self.base_alias;
        }
        if let Some(alias) = &self.primary_alias {
            if table == alias {
                return &self.base_alias;
            }
        }
        if let Some(join) = self
            .joins
            .iter()
            .find(|j| j.declared.as_deref() == Some(table))
        {
            return &join.compiled;
        }
        if let Some(join) = self.joins.iter().find(|j| j.base == table) {
            return &join.compiled;
        }
        &self.base_alias
    }

    /// Resolve a column reference (`"table.column"` or bare `"column"`) to
    /// `alias.column`. Outer-scope markers pass through untouched for the
    /// enclosing compilation's post-pass.
    pub fn resolve_column(&self, reference: &str) -> String {
        match reference.split_once('.') {
            Some((table, column)) if table == OUTER_MARKER => {
                format!("{}.{}", OUTER_MARKER, column)
            }
            Some((table, column)) => format!("{}.{}", self.resolve(table), column),
            None => format!("{}.{}", self.base_alias, reference),
        }
    }

    /// Post-pass rewrite of outer-scope markers to the enclosing alias
    pub fn rewrite_outer(text: &str, enclosing_alias: &str) -> String {
        text.replace(OUTER_MARKER, enclosing_alias)
    }
}
