//! Integration tests for the `pcsolve` binary.
//!
//! Every test runs the real binary against the workspace-level `tests/data/`
//! fixtures with a scrubbed `PKG_CONFIG_*` environment.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Returns the absolute path to the workspace-level `tests/data/` directory.
fn test_data_dir() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let workspace_root = manifest_dir.parent().unwrap().parent().unwrap();
    workspace_root.join("tests").join("data")
}

/// Build a Command for the `pcsolve` binary with the given search path.
fn pcsolve_with_path(path: &str) -> Command {
    let mut cmd = Command::cargo_bin("pcsolve").unwrap();
    cmd.env("PKG_CONFIG_PATH", path);
    cmd.env("PKG_CONFIG_LIBDIR", path);
    cmd.env_remove("PKG_CONFIG_SYSROOT_DIR");
    cmd.env_remove("PKG_CONFIG_ALLOW_SYSTEM_CFLAGS");
    cmd.env_remove("PKG_CONFIG_ALLOW_SYSTEM_LIBS");
    cmd.env_remove("PKG_CONFIG_MAXIMUM_TRAVERSE_DEPTH");
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Build a Command for the `pcsolve` binary over the fixtures and the
/// dependency graphs.
fn pcsolve() -> Command {
    let data = test_data_dir();
    let path = format!(
        "{}:{}",
        data.display(),
        data.join("dependencies").display()
    );
    pcsolve_with_path(&path)
}

// ============================================================================
// Basic queries
// ============================================================================

mod basic {
    use super::*;

    #[test]
    fn libs_simple() {
        pcsolve()
            .args(["--libs", "simple"])
            .assert()
            .success()
            .stdout("-lsimple\n");
    }

    #[test]
    fn cflags_simple_drops_system_include() {
        pcsolve()
            .args(["--cflags", "simple"])
            .assert()
            .success()
            .stdout("\n");
    }

    #[test]
    fn cflags_simple_keep_system() {
        pcsolve()
            .args(["--cflags", "--keep-system-cflags", "simple"])
            .assert()
            .success()
            .stdout("-I/usr/include\n");
    }

    #[test]
    fn keep_system_from_environment() {
        pcsolve()
            .env("PKG_CONFIG_ALLOW_SYSTEM_LIBS", "1")
            .args(["--libs", "system"])
            .assert()
            .success()
            .stdout("-L/usr/lib -lsystem\n");
    }

    #[test]
    fn libs_static_includes_private() {
        pcsolve()
            .args(["--libs", "--static", "simple"])
            .assert()
            .success()
            .stdout("-lsimple -lm\n");
    }

    #[test]
    fn cflags_and_libs_together() {
        pcsolve()
            .args(["--cflags", "--libs", "other"])
            .assert()
            .success()
            .stdout("-I/other/include -DOTHER -L/other/lib -Wl,--as-needed -lother\n");
    }

    #[test]
    fn modversion() {
        pcsolve()
            .args(["--modversion", "simple"])
            .assert()
            .success()
            .stdout("1.0.0\n");
    }

    #[test]
    fn variable() {
        pcsolve()
            .args(["--variable", "libdir", "simple"])
            .assert()
            .success()
            .stdout("/usr/lib\n");
    }

    #[test]
    fn undefined_variable_prints_empty_line() {
        pcsolve()
            .args(["--variable", "nope", "simple"])
            .assert()
            .success()
            .stdout("\n");
    }

    #[test]
    fn print_variables_in_declaration_order() {
        pcsolve()
            .args(["--print-variables", "simple"])
            .assert()
            .success()
            .stdout("pcfiledir\nprefix\nexec_prefix\nlibdir\nincludedir\n");
    }

    #[test]
    fn exists_without_query() {
        pcsolve().arg("simple").assert().success().stdout("");
    }

    #[test]
    fn version_flag() {
        pcsolve()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::is_empty().not());
    }
}

// ============================================================================
// Output filtering
// ============================================================================

mod filtering {
    use super::*;

    #[test]
    fn libs_only_upper_l() {
        pcsolve()
            .args(["--libs-only-L", "other"])
            .assert()
            .success()
            .stdout("-L/other/lib\n");
    }

    #[test]
    fn libs_only_lower_l() {
        pcsolve()
            .args(["--libs-only-l", "other"])
            .assert()
            .success()
            .stdout("-lother\n");
    }

    #[test]
    fn libs_only_other() {
        pcsolve()
            .args(["--libs-only-other", "other"])
            .assert()
            .success()
            .stdout("-Wl,--as-needed\n");
    }

    #[test]
    fn libs_only_combined() {
        pcsolve()
            .args(["--libs-only-L", "--libs-only-l", "other"])
            .assert()
            .success()
            .stdout("-L/other/lib -lother\n");
    }

    #[test]
    fn cflags_only_include() {
        pcsolve()
            .args(["--cflags-only-I", "other"])
            .assert()
            .success()
            .stdout("-I/other/include\n");
    }

    #[test]
    fn cflags_only_other() {
        pcsolve()
            .args(["--cflags-only-other", "other"])
            .assert()
            .success()
            .stdout("-DOTHER\n");
    }

    #[test]
    fn fragment_filter() {
        pcsolve()
            .args(["--libs", "--fragment-filter", "l", "other"])
            .assert()
            .success()
            .stdout("-lother\n");
    }

    #[test]
    fn fragment_filter_keeps_untyped_tokens() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("archive.pc"),
            "Name: archive\nVersion: 1\nLibs: -L/opt/lib -larchive /opt/lib/libextra.a\n",
        )
        .unwrap();

        pcsolve_with_path(dir.path().to_str().unwrap())
            .args(["--libs", "--fragment-filter", "l", "archive"])
            .assert()
            .success()
            .stdout("-larchive /opt/lib/libextra.a\n");
    }

    #[test]
    fn whitespace_is_escaped() {
        pcsolve()
            .args(["--cflags", "spaces"])
            .assert()
            .success()
            .stdout("-I/opt/my\\ libs/include\n");
    }
}

// ============================================================================
// Variables and sysroot
// ============================================================================

mod variables {
    use super::*;

    #[test]
    fn define_variable_overrides_prefix() {
        pcsolve()
            .args(["--define-variable", "prefix=/opt", "--cflags", "simple"])
            .assert()
            .success()
            .stdout("-I/opt/include\n");
    }

    #[test]
    fn define_variable_requires_equals() {
        pcsolve()
            .args(["--define-variable", "prefix", "--cflags", "simple"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--define-variable"));
    }

    #[test]
    fn define_variable_requires_a_name() {
        pcsolve()
            .args(["--define-variable", "=/opt", "--cflags", "simple"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("=/opt"));
    }

    #[test]
    fn sysroot_prefixes_paths() {
        pcsolve()
            .args(["--sysroot", "/sys", "--libs", "--keep-system-libs", "simple"])
            .assert()
            .success()
            .stdout("-L/sys/usr/lib -lsimple\n");
    }

    #[test]
    fn sysroot_paths_still_count_as_system() {
        pcsolve()
            .args(["--sysroot", "/sys", "--libs", "simple"])
            .assert()
            .success()
            .stdout("-lsimple\n");
    }

    #[test]
    fn sysroot_from_environment() {
        pcsolve()
            .env("PKG_CONFIG_SYSROOT_DIR", "/sys/")
            .args(["--cflags", "--keep-system-cflags", "simple"])
            .assert()
            .success()
            .stdout("-I/sys/usr/include\n");
    }
}

// ============================================================================
// Dependency ordering
// ============================================================================

mod ordering {
    use super::*;

    #[test]
    fn shared_dependency() {
        pcsolve()
            .args(["--libs", "a_dep_c", "b_dep_c"])
            .assert()
            .success()
            .stdout("-lb_dep_c -la_dep_c -lc_dep\n");
    }

    #[test]
    fn diamond() {
        pcsolve()
            .args(["--libs", "d_dep_e_f"])
            .assert()
            .success()
            .stdout("-le_dep_g_f -ld_dep_e_f -lg_dep -lf_dep_g\n");
    }

    #[test]
    fn nested() {
        pcsolve()
            .args(["--libs", "h_dep_k_i_j"])
            .assert()
            .success()
            .stdout("-li_dep_k_j -lh_dep_k_i_j -lj_dep_k -lk_dep\n");
    }

    #[test]
    fn circular_requirement_settles_each_member_once() {
        pcsolve()
            .args(["--libs", "circular-1"])
            .assert()
            .success()
            .stdout("-lcirc3 -lcirc2 -lcirc1\n");
    }

    #[test]
    fn static_private_requirement() {
        pcsolve()
            .args(["--libs", "--static", "private-req"])
            .assert()
            .success()
            .stdout("-lsimple -lm -lprivatereq -lpthread\n");
    }
}

// ============================================================================
// Failures
// ============================================================================

mod errors {
    use super::*;

    #[test]
    fn no_packages() {
        pcsolve()
            .arg("--libs")
            .assert()
            .failure()
            .stderr(predicate::str::contains("package name"));
    }

    #[test]
    fn missing_package() {
        pcsolve()
            .args(["--libs", "nonexistent"])
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("nonexistent"));
    }

    #[test]
    fn missing_dependency() {
        pcsolve()
            .args(["--libs", "missing-dep"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("does-not-exist"));
    }

    #[test]
    fn missing_package_without_query() {
        pcsolve().arg("nonexistent").assert().failure();
    }

    #[test]
    fn version_constraint_unsatisfied() {
        pcsolve()
            .args(["--libs", "simple >= 2.0"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("simple"));
    }

    #[test]
    fn transitive_version_mismatch() {
        pcsolve().args(["--libs", "versioned"]).assert().failure();
    }

    #[test]
    fn depth_bound() {
        pcsolve()
            .args(["--maximum-traverse-depth", "2", "--libs", "h_dep_k_i_j"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("h_dep_k_i_j"));
    }

    #[test]
    fn depth_bound_from_environment() {
        pcsolve()
            .env("PKG_CONFIG_MAXIMUM_TRAVERSE_DEPTH", "2")
            .args(["--libs", "h_dep_k_i_j"])
            .assert()
            .failure();
    }

    #[test]
    fn modversion_missing() {
        pcsolve()
            .args(["--modversion", "nonexistent"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("nonexistent"));
    }

    #[test]
    fn pcfiledir_points_at_descriptor_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("local.pc"),
            "Name: local\nVersion: 1\nCflags: -I${pcfiledir}/include\n",
        )
        .unwrap();
        let path = dir.path().to_str().unwrap();

        pcsolve_with_path(path)
            .args(["--cflags", "local"])
            .assert()
            .success()
            .stdout(format!("-I{path}/include\n"));
    }
}
