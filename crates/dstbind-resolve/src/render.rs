//! Declaration blocks and the binding manifest
//!
//! Turns the memo into the three declaration blocks and the glue source
//! handed to the binding generator.

use dstbind_core::Declaration;
use dstbind_tables::HeaderTables;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything the binding generator needs from a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingOutput {
    /// Declarations of the implied includes and their dependencies
    pub standard_types: String,
    /// Declarations of headers with a bank implementation source
    pub bank_declarations: String,
    /// Declarations of the remaining project headers
    pub other_declarations: String,
    pub bank_headers: Vec<String>,
    /// Standard-types header first
    pub other_headers: Vec<String>,
    /// C source including every other header
    pub glue_source: String,
    pub include_dirs: Vec<PathBuf>,
    pub library_dirs: Vec<PathBuf>,
    pub libraries: Vec<String>,
}

impl BindingOutput {
    /// Output files of a build, by file name
    pub fn files(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("std_types.h", self.standard_types.as_str()),
            ("bank_cdefs.h", self.bank_declarations.as_str()),
            ("other_cdefs.h", self.other_declarations.as_str()),
            ("glue.c", self.glue_source.as_str()),
        ]
    }
}

/// Drops declarations the binding generator must not see
pub struct DeclarationFilter<'a> {
    tables: &'a HeaderTables,
}

impl<'a> DeclarationFilter<'a> {
    pub fn new(tables: &'a HeaderTables) -> Self {
        Self { tables }
    }

    /// Whether `decl` survives filtering
    pub fn keep(&self, decl: &Declaration) -> bool {
        match decl {
            Declaration::Function(f) => !self.tables.is_invalid_function(&f.name),
            Declaration::Variable(v) => {
                !(decl.is_extern_variable() && self.tables.is_broken_extern(&v.name))
            }
            Declaration::Type(t) => !(decl.is_typedef_named(&t.name) && self.tables.is_native_type(&t.name)),
        }
    }
}

/// Render declarations one per line, filtered
pub fn render_block<'d>(
    declarations: impl IntoIterator<Item = &'d Declaration>,
    filter: &DeclarationFilter,
) -> String {
    let mut block = String::new();
    for decl in declarations {
        if filter.keep(decl) {
            block.push_str(decl.render());
            block.push('\n');
        }
    }
    block
}

/// One `#include "<include_dir>/<header>"` line per header
pub fn glue_source(include_dir: &Path, headers: &[String]) -> String {
    headers
        .iter()
        .map(|h| format!("#include \"{}\"\n", include_dir.join(h).display()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dstbind_core::{FuncDecl, TypeDecl, TypeKind, VarDecl};
    use dstbind_tables::InvalidEntry;
    use pretty_assertions::assert_eq;

    fn tables() -> HeaderTables {
        HeaderTables {
            invalid_functions: vec![InvalidEntry::new("fraw1_time_fprint")],
            broken_externs: vec![InvalidEntry::new("geoh_")],
            native_types: vec!["FILE".into()],
            ..HeaderTables::default()
        }
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

    fn var(name: &str, storage: &[&str]) -> Declaration {
        Declaration::Variable(VarDecl {
            name: name.into(),
            storage: storage.iter().map(|s| s.to_string()).collect(),
            text: format!("{} int {};", storage.join(" "), name).trim().to_string(),
            location: None,
        })
    }

    fn typedef(name: &str) -> Declaration {
        Declaration::Type(TypeDecl {
            name: name.into(),
            kind: TypeKind::Typedef,
            text: format!("typedef int {};", name),
            location: None,
        })
    }

    #[test]
    fn test_filter() {
        let tables = tables();
        let filter = DeclarationFilter::new(&tables);

        assert!(!filter.keep(&func("fraw1_time_fprint")));
        assert!(filter.keep(&func("fraw1_time_fprint_")));
        assert!(!filter.keep(&var("geoh_", &["extern"])));
        assert!(filter.keep(&var("geoh_", &[])));
        assert!(filter.keep(&var("geohr_", &["extern"])));
        assert!(!filter.keep(&typedef("FILE")));
        assert!(filter.keep(&typedef("size_t")));
    }

    #[test]
    fn test_render_block() {
        let tables = tables();
        let decls = vec![typedef("FILE"), typedef("integer4"), func("fraw1_time_fprint"), func("a_")];

        let block = render_block(&decls, &DeclarationFilter::new(&tables));
        assert_eq!(block, "typedef int integer4;\nint a_(void);\n");
    }

    #[test]
    fn test_glue_source() {
        let glue = glue_source(
            Path::new("/dst/inc"),
            &["dst_std_types.h".to_string(), "univ_dst.h".to_string()],
        );
        assert_eq!(
            glue,
            "#include \"/dst/inc/dst_std_types.h\"\n#include \"/dst/inc/univ_dst.h\"\n"
        );
    }
}
