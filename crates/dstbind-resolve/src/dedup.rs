//! Declaration deduplication
//!
//! A header is parsed together with all of its dependencies. Its own
//! declarations are what is left after dropping the leading declarations
//! the dependencies contributed, counted from their memo entries.

use dstbind_core::{DeclKey, Declaration, Error, Result};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Listed per side when a split check fails
const MAX_REPORTED_KEYS: usize = 5;

/// Declarations each resolved header introduced, in resolution order.
///
/// An entry is written once and never replaced.
#[derive(Debug, Clone, Default)]
pub struct DeclarationMemo {
    entries: HashMap<String, Vec<Declaration>>,
    order: Vec<String>,
}

impl DeclarationMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, header: &str) -> Option<&[Declaration]> {
        self.entries.get(header).map(|d| d.as_slice())
    }

    pub fn contains(&self, header: &str) -> bool {
        self.entries.contains_key(header)
    }

    /// Store a header's declarations. Returns false, keeping the existing
    /// entry, if the header was already resolved.
    pub fn insert(&mut self, header: &str, declarations: Vec<Declaration>) -> bool {
        if self.contains(header) {
            return false;
        }
        self.order.push(header.to_string());
        self.entries.insert(header.to_string(), declarations);
        true
    }

    /// Headers in the order they were resolved
    pub fn headers(&self) -> &[String] {
        &self.order
    }

    /// Entries in resolution order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Declaration])> {
        self.order
            .iter()
            .filter_map(|h| self.entries.get(h).map(|d| (h.as_str(), d.as_slice())))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Drop the declarations `dependencies` contributed to `parsed`.
///
/// Every dependency must already be memoized. The leading
/// `sum(len(memo[dep]))` declarations are removed. With `verify`, the
/// removed prefix must hold exactly the dependencies' declarations by
/// identity, and no kept declaration may be located in a dependency;
/// either failure is a [`Error::SplitMismatch`].
pub fn split_own_declarations(
    header: &str,
    mut parsed: Vec<Declaration>,
    dependencies: &[String],
    memo: &DeclarationMemo,
    verify: bool,
) -> Result<Vec<Declaration>> {
    let mut skip = 0;
    for dep in dependencies {
        let entry = memo.get(dep).ok_or_else(|| Error::SplitMismatch {
            header: header.to_string(),
            detail: format!("dependency {} has not been resolved", dep),
        })?;
        skip += entry.len();
    }

    if skip > parsed.len() {
        return Err(Error::SplitMismatch {
            header: header.to_string(),
            detail: format!(
                "dependencies declare {} items but only {} were parsed",
                skip,
                parsed.len()
            ),
        });
    }

    if verify {
        let mut balance: BTreeMap<DeclKey, i64> = BTreeMap::new();
        for decl in &parsed[..skip] {
            *balance.entry(decl.key()).or_default() += 1;
        }
        for dep in dependencies {
            for decl in memo.get(dep).unwrap_or_default() {
                *balance.entry(decl.key()).or_default() -= 1;
            }
        }
        balance.retain(|_, count| *count != 0);

        if !balance.is_empty() {
            return Err(Error::SplitMismatch {
                header: header.to_string(),
                detail: describe_imbalance(&balance),
            });
        }
    }

    let own = parsed.split_off(skip);

    if verify {
        let dependency_set: HashSet<&str> = dependencies.iter().map(String::as_str).collect();
        let leaked = own.iter().find(|d| {
            d.location()
                .map_or(false, |l| dependency_set.contains(l.file_name()))
        });
        if let Some(decl) = leaked {
            return Err(Error::SplitMismatch {
                header: header.to_string(),
                detail: format!(
                    "{} from {} follows the dependency prefix",
                    decl.key(),
                    decl.location().map(|l| l.file_name()).unwrap_or_default()
                ),
            });
        }
    }

    Ok(own)
}

fn describe_imbalance(balance: &BTreeMap<DeclKey, i64>) -> String {
    let list = |extra: bool| {
        let keys: Vec<String> = balance
            .iter()
            .filter(|(_, count)| (**count > 0) == extra)
            .take(MAX_REPORTED_KEYS)
            .map(|(key, _)| key.to_string())
            .collect();
        if keys.is_empty() {
            "none".to_string()
        } else {
            keys.join(", ")
        }
    };
    format!(
        "prefix has unexpected [{}]; prefix lacks [{}]",
        list(true),
        list(false)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dstbind_core::{FuncDecl, Location, TypeDecl, TypeKind};
    use pretty_assertions::assert_eq;

    fn typedef(name: &str) -> Declaration {
        Declaration::Type(TypeDecl {
            name: name.into(),
            kind: TypeKind::Typedef,
            text: format!("typedef int {};", name),
            location: None,
        })
    }

    fn func(name: &str) -> Declaration {
        Declaration::Function(FuncDecl {
            name: name.into(),
            storage: vec![],
            text: format!("int {}(void);", name),
            is_definition: false,
            location: None,
        })
    }

    fn memo_with(entries: &[(&str, Vec<Declaration>)]) -> DeclarationMemo {
        let mut memo = DeclarationMemo::new();
        for (header, decls) in entries {
            memo.insert(header, decls.clone());
        }
        memo
    }

    fn names(decls: &[Declaration]) -> Vec<&str> {
        decls.iter().map(|d| d.name()).collect()
    }

    #[test]
    fn test_memo_is_write_once() {
        let mut memo = DeclarationMemo::new();
        assert!(memo.insert("b.h", vec![typedef("b_t")]));
        assert!(!memo.insert("b.h", vec![]));
        assert_eq!(memo.get("b.h").unwrap().len(), 1);
        assert_eq!(memo.headers(), &["b.h".to_string()]);
    }

    #[test]
    fn test_memo_iterates_in_insertion_order() {
        let memo = memo_with(&[("z.h", vec![]), ("a.h", vec![]), ("m.h", vec![])]);
        let order: Vec<&str> = memo.iter().map(|(h, _)| h).collect();
        assert_eq!(order, vec!["z.h", "a.h", "m.h"]);
    }

    #[test]
    fn test_split_keeps_own_suffix_in_order() {
        let memo = memo_with(&[("b.h", vec![typedef("b_t"), func("b_init")]), ("c.h", vec![typedef("c_t")])]);
        let parsed = vec![typedef("b_t"), func("b_init"), typedef("c_t"), func("a2"), func("a1")];
        let deps = vec!["b.h".to_string(), "c.h".to_string()];

        let own = split_own_declarations("a.h", parsed, &deps, &memo, true).unwrap();
        assert_eq!(names(&own), vec!["a2", "a1"]);
    }

    #[test]
    fn test_split_prefix_order_may_differ() {
        let memo = memo_with(&[("b.h", vec![typedef("b_t")]), ("c.h", vec![typedef("c_t")])]);
        let parsed = vec![typedef("c_t"), typedef("b_t"), func("a")];
        let deps = vec!["b.h".to_string(), "c.h".to_string()];

        let own = split_own_declarations("a.h", parsed, &deps, &memo, true).unwrap();
        assert_eq!(names(&own), vec!["a"]);
    }

    #[test]
    fn test_split_without_dependencies() {
        let memo = DeclarationMemo::new();
        let own = split_own_declarations("b.h", vec![typedef("b_t")], &[], &memo, true).unwrap();
        assert_eq!(names(&own), vec!["b_t"]);
    }

    #[test]
    fn test_divergent_prefix_is_rejected() {
        let memo = memo_with(&[("b.h", vec![typedef("b_t"), func("b_init")])]);
        let parsed = vec![typedef("b_t"), func("b_other"), func("a")];
        let deps = vec!["b.h".to_string()];

        match split_own_declarations("a.h", parsed.clone(), &deps, &memo, true) {
            Err(Error::SplitMismatch { header, detail }) => {
                assert_eq!(header, "a.h");
                assert!(detail.contains("function b_other"), "{}", detail);
                assert!(detail.contains("function b_init"), "{}", detail);
            }
            other => panic!("expected mismatch, got {:?}", other),
        }

        let own = split_own_declarations("a.h", parsed, &deps, &memo, false).unwrap();
        assert_eq!(names(&own), vec!["a"]);
    }

    #[test]
    fn test_dependency_declaration_after_prefix_is_rejected() {
        let located = |name: &str, file: &str| {
            let mut decl = func(name);
            if let Declaration::Function(f) = &mut decl {
                f.location = Some(Location::new(file, 1, 0));
            }
            decl
        };
        let memo = memo_with(&[("b.h", vec![func("b_init")])]);
        let parsed = vec![
            located("b_init", "/inc/b.h"),
            located("b_extra", "/inc/b.h"),
            located("a", "<stdin>"),
        ];
        let deps = vec!["b.h".to_string()];

        let result = split_own_declarations("a.h", parsed, &deps, &memo, true);
        assert!(
            matches!(result, Err(Error::SplitMismatch { detail, .. }) if detail.contains("b_extra"))
        );
    }

    #[test]
    fn test_short_parse_is_rejected() {
        let memo = memo_with(&[("b.h", vec![typedef("b_t"), typedef("b2_t")])]);
        let deps = vec!["b.h".to_string()];

        let result = split_own_declarations("a.h", vec![typedef("b_t")], &deps, &memo, false);
        assert!(matches!(result, Err(Error::SplitMismatch { .. })));
    }

    #[test]
    fn test_unresolved_dependency_is_rejected() {
        let memo = DeclarationMemo::new();
        let deps = vec!["b.h".to_string()];

        let result = split_own_declarations("a.h", vec![func("a")], &deps, &memo, true);
        assert!(matches!(result, Err(Error::SplitMismatch { detail, .. }) if detail.contains("b.h")));
    }
}
