use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use argh::FromArgs;
use asset_io_core::archive::ZipIoSystem;
use asset_io_core::fs::{Error, IoSystem};
use asset_io_core::io::Stream;
use asset_io_core::layered::LayeredIoSystem;
use asset_io_desktop::std_fs::{StdIoSystem, StdStream};
use log::{error, info};

/// Look up and read assets through layered directories and archives.
#[derive(FromArgs)]
struct Args {
    /// directory relative paths are resolved against
    #[argh(option, short = 'r', default = "String::from(\".\")")]
    root: String,

    /// zip archive mounted above the root; later archives take precedence
    #[argh(option, short = 'a')]
    archive: Vec<String>,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Exists(ExistsCommand),
    Cat(CatCommand),
    Stat(StatCommand),
    List(ListCommand),
}

/// print whether a resource exists
#[derive(FromArgs)]
#[argh(subcommand, name = "exists")]
struct ExistsCommand {
    /// resource path
    #[argh(positional)]
    path: String,
}

/// write a resource to stdout
#[derive(FromArgs)]
#[argh(subcommand, name = "cat")]
struct CatCommand {
    /// resource path
    #[argh(positional)]
    path: String,
}

/// print the size of a resource in bytes
#[derive(FromArgs)]
#[argh(subcommand, name = "stat")]
struct StatCommand {
    /// resource path
    #[argh(positional)]
    path: String,
}

/// list the members of a zip archive
#[derive(FromArgs)]
#[argh(subcommand, name = "list")]
struct ListCommand {
    /// archive path
    #[argh(positional)]
    archive: String,
}

#[derive(Debug)]
enum CliError {
    Archive { path: String, source: Error },
    Resource { path: String, source: Error },
    Output(std::io::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Archive { path, source } => write!(f, "cannot read archive {path}: {source}"),
            CliError::Resource { path, source } => write!(f, "cannot read {path}: {source}"),
            CliError::Output(e) => write!(f, "cannot write output: {e}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Output(e)
    }
}

fn open_archive(path: &str) -> Result<ZipIoSystem<StdStream>, CliError> {
    let archive_error = |source: Error| CliError::Archive {
        path: path.to_string(),
        source,
    };
    let io_error = |e: std::io::Error| archive_error(Error::from(embedded_io::Error::kind(&e)));

    let file = std::fs::File::open(path).map_err(io_error)?;
    let stream = StdStream::new(file).map_err(io_error)?;
    ZipIoSystem::new(stream).map_err(archive_error)
}

fn mount(args: &Args) -> Result<LayeredIoSystem, CliError> {
    let mut layers = LayeredIoSystem::new();
    layers.mount(StdIoSystem::new_with_base_path(PathBuf::from(&args.root)), 0);
    for (idx, path) in args.archive.iter().enumerate() {
        info!("Mounting archive {path}");
        layers.mount(open_archive(path)?, idx as u32 + 1);
    }
    Ok(layers)
}

fn resource_error(path: &str) -> impl FnOnce(Error) -> CliError + '_ {
    move |source| CliError::Resource {
        path: path.to_string(),
        source,
    }
}

fn run(args: &Args, out: &mut impl Write) -> Result<(), CliError> {
    if let Command::List(list) = &args.command {
        let archive = open_archive(&list.archive)?;
        for entry in archive.entries() {
            writeln!(
                out,
                "{:>10} {:>10} {:<8} {}",
                entry.size, entry.compressed_size, entry.compression, entry.name
            )?;
        }
        return Ok(());
    }

    let layers = mount(args)?;
    match &args.command {
        Command::Exists(cmd) => writeln!(out, "{}", layers.exists(&cmd.path))?,
        Command::Cat(cmd) => {
            let mut stream = layers.open(&cmd.path).map_err(resource_error(&cmd.path))?;
            let data = stream
                .read_all()
                .map_err(|kind| resource_error(&cmd.path)(Error::from(kind)))?;
            layers.close(stream);
            out.write_all(&data)?;
        }
        Command::Stat(cmd) => {
            let stream = layers.open(&cmd.path).map_err(resource_error(&cmd.path))?;
            writeln!(out, "{}", stream.size())?;
            layers.close(stream);
        }
        Command::List(_) => {}
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Args = argh::from_env();
    let mut stdout = std::io::stdout().lock();
    let result = run(&args, &mut stdout).and_then(|()| stdout.flush().map_err(CliError::from));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use zip_testkit::ZipBuilder;

    fn write_zip(path: &std::path::Path, name: &str, data: &[u8]) {
        std::fs::write(path, ZipBuilder::new().stored(name, data).build()).unwrap();
    }

    fn run_args(args: &[&str]) -> Result<String, CliError> {
        let args = Args::from_args(&["assetio"], args).unwrap();
        let mut out = Vec::new();
        run(&args, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_root_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("crate.obj"), "v 0 0 0\n").unwrap();
        let root = dir.path().to_str().unwrap();

        assert_eq!(run_args(&["--root", root, "exists", "crate.obj"]).unwrap(), "true\n");
        assert_eq!(run_args(&["--root", root, "exists", "barrel.obj"]).unwrap(), "false\n");
        assert_eq!(run_args(&["--root", root, "cat", "crate.obj"]).unwrap(), "v 0 0 0\n");
        assert_eq!(run_args(&["--root", root, "stat", "crate.obj"]).unwrap(), "8\n");
        assert!(matches!(
            run_args(&["--root", root, "cat", "barrel.obj"]),
            Err(CliError::Resource { source: Error::NotFound, .. })
        ));
    }

    #[test]
    fn test_archive_overrides_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("crate.obj"), "base\n").unwrap();
        std::fs::write(dir.path().join("crate.mtl"), "base material\n").unwrap();
        let zip = dir.path().join("mod.zip");
        write_zip(&zip, "Crate.obj", b"mod\n");
        let (root, zip) = (dir.path().to_str().unwrap(), zip.to_str().unwrap());

        let cat = |path: &str| run_args(&["--root", root, "--archive", zip, "cat", path]);
        assert_eq!(cat("crate.obj").unwrap(), "mod\n");
        assert_eq!(cat("crate.mtl").unwrap(), "base material\n");

        let listing = run_args(&["list", zip]).unwrap();
        assert!(listing.trim_end().ends_with("Crate.obj"), "{listing}");
    }

    #[test]
    fn test_bad_archive() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.zip");
        std::fs::write(&bogus, "not a zip").unwrap();

        for archive in [bogus.to_str().unwrap(), "/nonexistent/mod.zip"] {
            assert!(matches!(
                run_args(&["--archive", archive, "exists", "crate.obj"]),
                Err(CliError::Archive { .. })
            ));
        }
    }
}
