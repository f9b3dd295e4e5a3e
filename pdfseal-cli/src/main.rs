use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use pdfseal::encryption::{
    file_id_array, Aes256Revision, DocumentIdGenerator, EncryptionAlgorithm, EncryptionConfig,
    EncryptionDictionary, Permissions, StandardSecurityHandler,
};
use pdfseal::objects::{Dictionary, Object};
use pdfseal::parser::{read_indirect_object, read_object, FileSource, Lexer};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use unicode_normalization::UnicodeNormalization;

#[derive(Parser)]
#[command(
    name = "pdfseal",
    about = "Inspect PDF tokens and work with standard security handler dictionaries",
    version,
    author
)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump the token stream of a file
    Tokens {
        /// Input file
        input: PathBuf,

        /// Stop after this many tokens
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// One JSON object per line
        #[arg(long)]
        json: bool,
    },

    /// Show PDF version, header offset and startxref
    Header {
        /// Input PDF file
        input: PathBuf,
    },

    /// Create keys and print a trailer with /Encrypt and /ID
    EncryptDict {
        /// rc4-40, rc4-128, aes-128 or aes-256
        #[arg(short, long, default_value = "aes-256")]
        algorithm: EncryptionAlgorithm,

        /// User password
        #[arg(short, long, default_value = "")]
        user: String,

        /// Owner password (random when empty)
        #[arg(short, long, default_value = "")]
        owner: String,

        /// Raw /P value
        #[arg(short, long, allow_negative_numbers = true)]
        permissions: Option<i64>,

        /// Granted permissions, e.g. "print,copy,fill-forms"
        #[arg(long, value_delimiter = ',')]
        allow: Vec<String>,

        /// Leave metadata streams unencrypted
        #[arg(long)]
        no_metadata: bool,

        /// Write AES-256 as revision 6
        #[arg(long)]
        r6: bool,

        /// Document id as hex (generated when missing)
        #[arg(long)]
        id: Option<String>,

        /// Output file (defaults to stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Check a password against an /Encrypt dictionary
    Unlock {
        /// File holding an /Encrypt dictionary or a trailer containing one
        input: PathBuf,

        /// Document id as hex (taken from the trailer /ID when missing)
        #[arg(long)]
        id: Option<String>,

        /// Password to try
        #[arg(short, long, default_value = "")]
        password: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct UnlockReport {
    algorithm: String,
    revision: i64,
    owner: bool,
    p: i32,
    permissions: Vec<String>,
    encrypt_metadata: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Tokens { input, limit, json } => dump_tokens(&input, limit, json)?,
        Commands::Header { input } => show_header(&input)?,
        Commands::EncryptDict {
            algorithm,
            user,
            owner,
            permissions,
            allow,
            no_metadata,
            r6,
            id,
            output,
        } => {
            let mut granted = permissions
                .map(Permissions::from_p_value)
                .unwrap_or_else(Permissions::empty);
            for name in &allow {
                granted |= parse_permission(name)?;
            }

            let (revision, user, owner) = if r6 {
                (
                    Aes256Revision::R6,
                    prepare_password(&user),
                    prepare_password(&owner),
                )
            } else {
                (Aes256Revision::R5, user, owner)
            };
            let config = EncryptionConfig::new(algorithm)
                .user_password(&user)
                .owner_password(&owner)
                .permissions(granted)
                .encrypt_metadata(!no_metadata)
                .aes256_revision(revision);

            let generator = DocumentIdGenerator::new();
            let document_id = match id {
                Some(hex_id) => decode_id(&hex_id)?,
                None => generator.next_id(),
            };
            let handler = StandardSecurityHandler::setup(&config, &document_id)?;
            info!(
                algorithm = %handler.algorithm(),
                revision = handler.revision(),
                "created encryption keys"
            );

            let mut trailer = Dictionary::new();
            trailer.set("Encrypt", handler.encryption_dictionary().to_dict());
            trailer.set("ID", file_id_array(Some(document_id.as_slice()), false, &generator));
            let mut bytes = trailer.to_bytes();
            bytes.push(b'\n');

            match output {
                Some(path) => fs::write(&path, &bytes)
                    .with_context(|| format!("cannot write {}", path.display()))?,
                None => io::stdout().write_all(&bytes)?,
            }
        }
        Commands::Unlock {
            input,
            id,
            password,
            json,
        } => unlock(&input, id.as_deref(), &password, json)?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open_lexer(path: &Path) -> Result<Lexer<FileSource>> {
    let source = FileSource::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    Ok(Lexer::new(source))
}

fn dump_tokens(path: &Path, limit: Option<usize>, json: bool) -> Result<()> {
    let mut lexer = open_lexer(path)?;
    let mut out = io::stdout().lock();

    for token in lexer.tokens().take(limit.unwrap_or(usize::MAX)) {
        let token = token?;
        if json {
            serde_json::to_writer(&mut out, &token)?;
            writeln!(out)?;
        } else {
            writeln!(
                out,
                "{:>8}  {:<10}  {}",
                token.offset,
                format!("{:?}", token.kind),
                token.value.escape_ascii()
            )?;
        }
    }
    Ok(())
}

fn show_header(path: &Path) -> Result<()> {
    let mut lexer = open_lexer(path)?;
    let header = lexer.check_pdf_header()?;

    println!("PDF version: {}", header.version);
    if !header.version.is_supported() {
        println!("  (not a version this tool knows)");
    }
    println!("Header offset: {}", header.offset);
    println!(
        "Binary marker: {}",
        if header.has_binary_marker { "yes" } else { "no" }
    );

    match lexer.read_startxref() {
        Ok(offset) => println!("startxref: {offset}"),
        Err(e) => {
            debug!(error = %e, "no usable startxref");
            println!("startxref: not found");
        }
    }
    Ok(())
}

fn unlock(path: &Path, id: Option<&str>, password: &str, json: bool) -> Result<()> {
    let object = read_first_object(path)?;
    let dict = object
        .as_dict()
        .ok_or_else(|| anyhow!("{} does not start with a dictionary", path.display()))?;

    let (encrypt, trailer_id) = match dict.get("Encrypt") {
        Some(Object::Dictionary(encrypt)) => (encrypt, trailer_id(dict)),
        Some(Object::Reference(reference)) => {
            bail!("/Encrypt is the indirect object {reference}; pass that object instead")
        }
        Some(_) => bail!("/Encrypt is not a dictionary"),
        None => (dict, None),
    };

    let document_id = match (id, trailer_id) {
        (Some(hex_id), _) => decode_id(hex_id)?,
        (None, Some(trailer_id)) => trailer_id,
        (None, None) => bail!("no /ID in the input, pass the document id with --id"),
    };

    let encryption = EncryptionDictionary::from_dict(encrypt)?;
    let password = if encryption.r >= 6 {
        prepare_password(password)
    } else {
        password.to_string()
    };
    let handler =
        StandardSecurityHandler::read_key(&encryption, &document_id, password.as_bytes())?;

    let report = UnlockReport {
        algorithm: handler.algorithm().to_string(),
        revision: handler.revision(),
        owner: handler.is_owner_password(),
        p: handler.permissions().p_value(),
        permissions: handler
            .permissions()
            .iter_names()
            .map(|(name, _)| name.to_string())
            .collect(),
        encrypt_metadata: handler.encrypt_metadata(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Algorithm: {} (R{})", report.algorithm, report.revision);
        println!(
            "Password: {}",
            if report.owner { "owner" } else { "user" }
        );
        println!("Permissions: {} (P = {})", report.permissions.join(", "), report.p);
        println!(
            "Encrypt metadata: {}",
            if report.encrypt_metadata { "yes" } else { "no" }
        );
    }
    Ok(())
}

/// `N G obj` wrapped object, or a bare one
fn read_first_object(path: &Path) -> Result<Object> {
    let mut lexer = open_lexer(path)?;
    if let Ok((id, object)) = read_indirect_object(&mut lexer) {
        debug!(%id, "read indirect object");
        return Ok(object);
    }
    lexer.seek(0)?;
    Ok(read_object(&mut lexer)?)
}

fn trailer_id(trailer: &Dictionary) -> Option<Vec<u8>> {
    trailer
        .get("ID")?
        .as_array()?
        .first()?
        .as_bytes()
        .map(<[u8]>::to_vec)
}

fn decode_id(hex_id: &str) -> Result<Vec<u8>> {
    hex::decode(hex_id.trim()).with_context(|| format!("document id '{hex_id}' is not hex"))
}

/// Revision 6 passwords are compared after Unicode normalization
fn prepare_password(password: &str) -> String {
    password.nfkc().collect()
}

fn parse_permission(name: &str) -> Result<Permissions> {
    let flag = match name.trim().to_ascii_lowercase().as_str() {
        "print" => Permissions::PRINT,
        "modify" => Permissions::MODIFY_CONTENTS,
        "copy" => Permissions::COPY,
        "annotate" => Permissions::MODIFY_ANNOTATIONS,
        "fill-forms" => Permissions::FILL_FORMS,
        "accessibility" => Permissions::ACCESSIBILITY,
        "assemble" => Permissions::ASSEMBLE,
        "print-hq" => Permissions::PRINT_HIGH_QUALITY,
        "all" => Permissions::all(),
        other => bail!("unknown permission '{other}'"),
    };
    Ok(flag)
}
