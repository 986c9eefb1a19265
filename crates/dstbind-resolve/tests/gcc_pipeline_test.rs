//! Integration tests running the pipeline through a real `gcc -E`
//!
//! Skipped when no C preprocessor is installed.

use dstbind_core::{Config, Error};
use dstbind_parser::GccPreprocessor;
use dstbind_resolve::{load_tables, Pipeline};
use dstbind_tables::{HeaderTables, InvalidEntry};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const STDLIB_H: &str = r#"#ifndef _FAKE_STDLIB_H
#define _FAKE_STDLIB_H
typedef int size_t;
typedef struct _IO_FILE FILE;
void *malloc(size_t n);
#endif
"#;

const DST_STD_TYPES_H: &str = r#"#ifndef _DST_STD_TYPES_
#define _DST_STD_TYPES_
#include <stdlib.h>
#define MAXHIT 16
typedef int integer4;
typedef float real4;
#endif
"#;

const UNIV_DST_H: &str = r#"#ifndef _UNIV_DST_
#define _UNIV_DST_
#define UNIV_BANKID 12001
typedef struct {
  integer4 bankid;
  real4 x[MAXHIT];
} univ_dst_common;
extern univ_dst_common univ_;
extern integer4 geoh_;
#endif
"#;

const FRAW1_DST_H: &str = r#"#ifndef _FRAW1_DST_
#define _FRAW1_DST_
#include "univ_dst.h"
#define FRAW1_BANKID (UNIV_BANKID + 1)
typedef struct {
  integer4 nhit;
  real4 q[MAXHIT];
} fraw1_dst_common;
extern fraw1_dst_common fraw1_;
integer4 fraw1_common_to_bank_(void);
integer4 fraw1_time_fprint(FILE *fp);
integer4 fraw1_time_fprint_(integer4 *unit);
#endif
"#;

fn gcc() -> Option<GccPreprocessor> {
    GccPreprocessor::new().ok().filter(|p| p.is_available())
}

fn write(root: &Path, path: &str, text: &str) {
    fs::write(root.join(path), text).unwrap();
}

fn create_dst_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    for dir in ["inc", "lib", "src/bank/lib", "fake_libc_include"] {
        fs::create_dir_all(root.join(dir)).unwrap();
    }
    write(root, "fake_libc_include/stdlib.h", STDLIB_H);
    write(root, "inc/dst_std_types.h", DST_STD_TYPES_H);
    write(root, "inc/univ_dst.h", UNIV_DST_H);
    write(root, "inc/fraw1_dst.h", FRAW1_DST_H);
    write(root, "inc/iomonitor.h", "#include <zlib.h>\n");
    write(root, "src/bank/lib/fraw1_dst.c", "#include \"fraw1_dst.h\"\n");
    temp
}

fn config(temp: &TempDir) -> Config {
    Config::from_root(temp.path(), temp.path().join("fake_libc_include")).unwrap()
}

fn tables() -> HeaderTables {
    HeaderTables {
        broken_externs: vec![InvalidEntry::new("geoh_")],
        ..HeaderTables::builtin().unwrap()
    }
}

#[test]
fn test_full_run_with_gcc() {
    let Some(preprocessor) = gcc() else { return };
    let temp = create_dst_tree();
    let config = config(&temp);

    let mut pipeline = Pipeline::new(&config, tables(), preprocessor);
    let output = pipeline.run(&config.bank_source_dir).unwrap();

    assert_eq!(output.bank_headers, vec!["fraw1_dst.h"]);
    assert_eq!(output.other_headers, vec!["dst_std_types.h", "univ_dst.h"]);

    assert!(output.standard_types.contains("typedef int integer4;"));
    assert!(output.standard_types.contains("void *malloc(size_t n);"));
    assert!(!output.standard_types.contains("FILE;"));

    assert!(output.bank_declarations.contains("real4 q[16];"));
    assert!(output.bank_declarations.contains("fraw1_time_fprint_(integer4 *unit);"));
    assert!(!output.bank_declarations.contains("fraw1_time_fprint(FILE"));
    assert!(!output.bank_declarations.contains("univ_dst_common"));

    assert!(output.other_declarations.contains("extern univ_dst_common univ_;"));
    assert!(!output.other_declarations.contains("geoh_"));
    assert!(!output.other_declarations.contains("integer4;"));

    assert_eq!(output.libraries, vec!["dst2k", "bz2", "m", "c", "z"]);
}

#[test]
fn test_declarations_carry_original_files() {
    let Some(preprocessor) = gcc() else { return };
    let temp = create_dst_tree();
    let config = config(&temp);

    let mut pipeline = Pipeline::new(&config, tables(), preprocessor);
    let own = pipeline.resolve_header("fraw1_dst.h").unwrap();

    assert_eq!(own.len(), 5);
    let univ = pipeline.memo().get("univ_dst.h").unwrap();
    assert_eq!(univ.len(), 3);
    assert!(own.iter().all(|d| d.location().unwrap().file == "<stdin>"));
}

#[test]
fn test_preprocessor_error_aborts_run() {
    let Some(preprocessor) = gcc() else { return };
    let temp = create_dst_tree();
    write(
        temp.path(),
        "inc/broken_dst.h",
        "#include \"univ_dst.h\"\n#error broken header\n",
    );
    let config = config(&temp);

    let mut pipeline = Pipeline::new(&config, tables(), preprocessor);
    let err = pipeline.run(&config.bank_source_dir).unwrap_err();
    assert!(matches!(err, Error::Preprocess(msg) if msg.contains("broken header")));
}

#[test]
fn test_builtin_tables_used_without_override() {
    let temp = create_dst_tree();
    let config = config(&temp);
    assert_eq!(load_tables(&config).unwrap(), HeaderTables::builtin().unwrap());
}
