//! The `pcsolve` command: a pkg-config style front end for the pcsolve resolver.
//!
//! Resolves the requested packages against the configured search path and
//! prints their compiler or linker flags, versions, or variables.

use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;

use pcsolve::client::Client;
use pcsolve::fragment::{FilterConfig, FragmentKind, KindMask};
use pcsolve::{PKGCONFIG_COMPAT_VERSION, VERSION};

/// Resolve package dependencies and print their build flags.
#[derive(Parser, Debug)]
#[command(
    name = "pcsolve",
    about = "resolve pkg-config dependencies and render compiler/linker flags",
    long_about = None,
    disable_version_flag = true,
    args_override_self = true,
)]
struct Cli {
    // ── Basic options ────────────────────────────────────────────────
    /// Print the pcsolve version.
    #[arg(long)]
    version: bool,

    /// Print the supported pkg-config version.
    #[arg(long = "compat-version")]
    compat_version: bool,

    /// Enable trace output on stderr.
    #[arg(long)]
    debug: bool,

    // ── Search and variables ─────────────────────────────────────────
    /// Add a directory to the front of the search path.
    #[arg(long = "with-path", value_name = "PATH")]
    with_path: Vec<String>,

    /// Define variable 'varname' as 'value' (format: varname=value).
    #[arg(long = "define-variable", value_name = "VARNAME=VALUE")]
    define_variable: Vec<String>,

    /// Prefix absolute include and library paths with DIR.
    #[arg(long, value_name = "DIR")]
    sysroot: Option<String>,

    // ── Resolution ──────────────────────────────────────────────────
    /// Maximum allowed depth for the dependency graph.
    #[arg(long = "maximum-traverse-depth", value_name = "DEPTH")]
    maximum_traverse_depth: Option<usize>,

    /// Follow private requirements and emit private flags.
    #[arg(long = "static")]
    r#static: bool,

    // ── Querying fields ─────────────────────────────────────────────
    /// Print required CFLAGS.
    #[arg(long)]
    cflags: bool,

    /// Print required include-dir CFLAGS only.
    #[arg(long = "cflags-only-I")]
    cflags_only_i: bool,

    /// Print required non-include-dir CFLAGS only.
    #[arg(long = "cflags-only-other")]
    cflags_only_other: bool,

    /// Print required linker flags.
    #[arg(long)]
    libs: bool,

    /// Print required LDPATH linker flags only.
    #[arg(long = "libs-only-L")]
    libs_only_l_upper: bool,

    /// Print required LIBNAME linker flags only.
    #[arg(long = "libs-only-l")]
    libs_only_l_lower: bool,

    /// Print required other linker flags only.
    #[arg(long = "libs-only-other")]
    libs_only_other: bool,

    /// Keep system cflags (e.g. -I/usr/include) in output.
    #[arg(long = "keep-system-cflags")]
    keep_system_cflags: bool,

    /// Keep system libs (e.g. -L/usr/lib) in output.
    #[arg(long = "keep-system-libs")]
    keep_system_libs: bool,

    /// Filter output fragments to the specified type tags.
    #[arg(long = "fragment-filter", value_name = "TYPES")]
    fragment_filter: Option<String>,

    /// Print the specified modules' versions.
    #[arg(long)]
    modversion: bool,

    /// Print the specified variable entry.
    #[arg(long, value_name = "VARNAME")]
    variable: Option<String>,

    /// Print all variables declared by the module.
    #[arg(long = "print-variables")]
    print_variables: bool,

    // ── Positional ──────────────────────────────────────────────────
    /// Package names (and optional version constraints) to query.
    packages: Vec<String>,
}

impl Cli {
    fn wants_cflags(&self) -> bool {
        self.cflags || self.cflags_only_i || self.cflags_only_other
    }

    fn wants_libs(&self) -> bool {
        self.libs || self.libs_only_l_upper || self.libs_only_l_lower || self.libs_only_other
    }

    /// The `--*-only-*` flags that apply to `kind`.
    fn mask(&self, kind: FragmentKind) -> KindMask {
        let pick = |on: bool, mask: KindMask| if on { mask } else { KindMask::NONE };
        match kind {
            FragmentKind::Cflags => pick(self.cflags_only_i, KindMask::INCLUDE_PATH)
                .with(pick(self.cflags_only_other, KindMask::OTHER)),
            FragmentKind::Libs => pick(self.libs_only_l_upper, KindMask::LIBRARY_PATH)
                .with(pick(self.libs_only_l_lower, KindMask::LIBRARY_NAME))
                .with(pick(self.libs_only_other, KindMask::OTHER)),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pcsolve: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(debug: bool) {
    let env = env_logger::Env::default().default_filter_or(if debug { "trace" } else { "warn" });
    let mut builder = env_logger::Builder::from_env(env);
    if debug {
        builder.filter_level(log::LevelFilter::Trace);
    }
    builder.format_timestamp(None).init();
}

/// Build a [`Client`] from CLI arguments and the environment.
fn build_client(cli: &Cli) -> Result<Client> {
    let mut builder = Client::builder()
        .with_paths(&cli.with_path)
        .enable_static(cli.r#static)
        .keep_system_cflags(cli.keep_system_cflags)
        .keep_system_libs(cli.keep_system_libs);

    if let Some(ref sysroot) = cli.sysroot {
        builder = builder.sysroot_dir(sysroot);
    }

    if let Some(depth) = cli.maximum_traverse_depth {
        builder = builder.max_traversal_depth(depth);
    }

    let mut client = builder.build();
    for def in &cli.define_variable {
        client
            .define_variable_from_str(def)
            .with_context(|| format!("invalid --define-variable '{def}'"))?;
    }

    Ok(client)
}

fn filter_for(cli: &Cli, client: &Client, kind: FragmentKind) -> Result<FilterConfig> {
    let mut filter = client.filter_config(kind).only(cli.mask(kind));
    if let Some(ref types) = cli.fragment_filter {
        filter = filter.fragment_filter(types.as_str());
    }
    filter
        .validate()
        .with_context(|| format!("invalid {kind} filter"))?;
    Ok(filter)
}

fn run(cli: &Cli) -> Result<()> {
    if cli.version {
        println!("{VERSION}");
        return Ok(());
    }

    if cli.compat_version {
        println!("{PKGCONFIG_COMPAT_VERSION}");
        return Ok(());
    }

    if cli.packages.is_empty() {
        bail!("please specify at least one package name on the command line");
    }

    let mut client = build_client(cli)?;
    log::debug!("search path: {}", client.search_path());

    if cli.modversion {
        let versions = client
            .modversion(&cli.packages)
            .with_context(|| format!("no version found for {}", cli.packages.join(", ")))?;
        println!("{versions}");
        return Ok(());
    }

    if let Some(ref variable) = cli.variable {
        // An undefined variable prints an empty line, as pkg-config does
        let value = client.get_variable(&cli.packages, variable).unwrap_or_default();
        println!("{value}");
        return Ok(());
    }

    if cli.print_variables {
        for name in &cli.packages {
            let vars = client
                .list_variables(name)
                .with_context(|| format!("package '{name}' was not found"))?;
            for var in vars {
                println!("{var}");
            }
        }
        return Ok(());
    }

    let mut parts = Vec::new();

    if cli.wants_cflags() {
        let filter = filter_for(cli, &client, FragmentKind::Cflags)?;
        let cflags = client
            .cflags(&cli.packages, &filter)
            .context("cannot compute cflags")?;
        parts.push(cflags);
    }

    if cli.wants_libs() {
        let filter = filter_for(cli, &client, FragmentKind::Libs)?;
        let libs = client
            .libs(&cli.packages, &filter)
            .context("cannot compute libs")?;
        parts.push(libs);
    }

    if parts.is_empty() {
        // No query requested: succeed iff the packages resolve
        let filter = client.filter_config(FragmentKind::Libs);
        client
            .libs(&cli.packages, &filter)
            .context("cannot resolve packages")?;
        return Ok(());
    }

    let rendered: Vec<&str> = parts
        .iter()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .collect();
    println!("{}", rendered.join(" "));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pcsolve").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_only_flags_map_to_masks() {
        let cli = parse(&["--libs-only-L", "--libs-only-other", "foo"]);
        let mask = cli.mask(FragmentKind::Libs);
        assert!(mask.contains(KindMask::LIBRARY_PATH));
        assert!(mask.contains(KindMask::OTHER));
        assert!(!mask.contains(KindMask::LIBRARY_NAME));
        assert!(cli.wants_libs());
        assert!(!cli.wants_cflags());
    }

    #[test]
    fn test_cflags_mask_ignores_libs_flags() {
        let cli = parse(&["--cflags-only-I", "--libs-only-l", "foo"]);
        assert_eq!(cli.mask(FragmentKind::Cflags), KindMask::INCLUDE_PATH);
        assert_eq!(cli.mask(FragmentKind::Libs), KindMask::LIBRARY_NAME);
    }

    #[test]
    fn test_repeatable_options() {
        let cli = parse(&[
            "--with-path",
            "/a",
            "--with-path",
            "/b",
            "--define-variable",
            "prefix=/opt",
            "--define-variable",
            "libdir=/opt/lib",
            "foo",
            "bar >= 1.0",
        ]);
        assert_eq!(cli.with_path, ["/a", "/b"]);
        assert_eq!(cli.define_variable.len(), 2);
        assert_eq!(cli.packages, ["foo", "bar >= 1.0"]);
    }

    #[test]
    fn test_bad_define_variable_is_rejected() {
        let cli = parse(&["--define-variable", "noequals", "foo"]);
        let err = build_client(&cli).unwrap_err();
        assert!(err.to_string().contains("noequals"));
    }

    #[test]
    fn test_define_variable_needs_a_name() {
        let cli = parse(&["--define-variable", "=x", "foo"]);
        let err = build_client(&cli).unwrap_err();
        assert!(err.to_string().contains("'=x'"));
    }
}
