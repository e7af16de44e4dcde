//! `docprobe fetch`: look up the documents of a package URL and write them
//! out.

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::ArgMatches;
use docprobe_core::{Document, FetchOptions, Format, FormatList, Probe, ProbeRegistry};
use docprobe_oci::{OciOptions, OciProber, RegistryClient};
use tracing::{debug, info, instrument, warn};

use crate::cli::FetchArgs;
use crate::config::Config;
use crate::errors::CliError;

/// Where fetched documents go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Document bodies, one after another, on stdout.
    Bodies,
    /// One `format<TAB>sha256` line per document on stdout.
    List,
    /// One file per document in a directory.
    Directory(PathBuf),
}

impl OutputMode {
    fn from_args(args: &FetchArgs) -> Self {
        match (&args.output_dir, args.list) {
            (Some(dir), _) => Self::Directory(dir.clone()),
            (None, true) => Self::List,
            (None, false) => Self::Bodies,
        }
    }
}

/// Fully resolved settings for one fetch.
#[derive(Debug, Clone)]
pub struct FetchPlan {
    pub purl: String,
    pub formats: FormatList,
    pub oci: OciOptions,
    pub output: OutputMode,
}

impl FetchPlan {
    /// Combine flags, the config file and the environment.
    pub fn resolve(args: &FetchArgs, matches: &ArgMatches) -> Result<Self, CliError> {
        let config = Config::load_optional(args.config.as_deref())?;
        let oci = args.option_layers(matches).merge(config.oci);
        let formats = if args.formats.is_empty() {
            config.formats
        } else {
            args.formats.iter().cloned().collect()
        };

        Ok(Self {
            purl: args.purl.clone(),
            formats,
            oci,
            output: OutputMode::from_args(args),
        })
    }

    /// The probe with every known package prober registered.
    #[must_use]
    pub fn probe(&self) -> Probe {
        let registry = ProbeRegistry::new();
        registry.register(OciProber::new(RegistryClient::new(), self.oci.clone()));

        Probe::new(Arc::new(registry))
            .with_options(FetchOptions::new().with_formats(self.formats.clone()))
    }
}

#[instrument(name = "fetch_command", skip_all, fields(purl = %args.purl))]
pub async fn execute(args: &FetchArgs, matches: &ArgMatches) -> miette::Result<()> {
    let plan = FetchPlan::resolve(args, matches)?;
    debug!(?plan, "Resolved fetch settings");

    let mut docs = plan.probe().fetch(&plan.purl).await?;
    info!(count = docs.len(), "Fetched documents");

    let written = {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        write_documents(&mut docs, &plan.output, &mut out)
    };
    let released = release_all(&mut docs);

    written?;
    released?;
    Ok(())
}

/// Write documents according to `mode`. Stdout modes write to `out`.
pub fn write_documents(
    docs: &mut [Document],
    mode: &OutputMode,
    out: &mut impl Write,
) -> miette::Result<()> {
    match mode {
        OutputMode::Bodies => write_bodies(docs, out)?,
        OutputMode::List => write_listing(docs, out)?,
        OutputMode::Directory(dir) => {
            let paths = write_directory(docs, dir)?;
            debug!(count = paths.len(), dir = %dir.display(), "Wrote documents");
        }
    }
    Ok(())
}

/// Concatenate the document bodies.
pub fn write_bodies(docs: &mut [Document], out: &mut impl Write) -> Result<(), CliError> {
    for doc in docs.iter_mut() {
        doc.seek(SeekFrom::Start(0)).map_err(CliError::output)?;
        io::copy(doc, out).map_err(CliError::output)?;
    }
    out.flush().map_err(CliError::output)
}

/// One `format<TAB>sha256` line per document.
pub fn write_listing(docs: &mut [Document], out: &mut impl Write) -> miette::Result<()> {
    for doc in docs.iter_mut() {
        let digest = doc.hash()?;
        writeln!(out, "{}\t{digest}", doc.format()).map_err(CliError::output)?;
    }
    out.flush().map_err(CliError::output)?;
    Ok(())
}

/// Write each document to `<dir>/<n>.<ext>`, numbering from 1.
pub fn write_directory(docs: &mut [Document], dir: &Path) -> Result<Vec<PathBuf>, CliError> {
    std::fs::create_dir_all(dir).map_err(|e| CliError::file("creating", dir, e))?;

    let mut paths = Vec::with_capacity(docs.len());
    for (i, doc) in docs.iter_mut().enumerate() {
        let path = dir.join(format!("{}.{}", i + 1, extension(doc.format())));
        let mut file = File::create(&path).map_err(|e| CliError::file("creating", &path, e))?;
        doc.seek(SeekFrom::Start(0))
            .map_err(|e| CliError::file("writing", &path, e))?;
        io::copy(doc, &mut file).map_err(|e| CliError::file("writing", &path, e))?;
        paths.push(path);
    }
    Ok(paths)
}

/// File extension for a format: `text/spdx+json` becomes `spdx.json`,
/// `application/vnd.cyclonedx+json` becomes `cyclonedx.json`.
#[must_use]
pub fn extension(format: &Format) -> String {
    let mime = format.mime_type();
    let subtype = mime.rsplit_once('/').map_or(mime.as_str(), |(_, sub)| sub);
    let subtype = subtype.strip_prefix("vnd.").unwrap_or(subtype);
    if subtype.is_empty() {
        return "bin".to_string();
    }
    subtype.replace('+', ".")
}

/// Release every document, reporting the first failure.
pub fn release_all(docs: &mut [Document]) -> miette::Result<()> {
    let mut first_error = None;
    for doc in docs.iter_mut() {
        if let Err(e) = doc.release() {
            warn!(error = %e, "Failed to release document");
            if first_error.is_none() {
                first_error = Some(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
