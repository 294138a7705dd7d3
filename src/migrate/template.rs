//! wp-config.php rendering from the WordPress sample config

use rand::Rng;
use regex::{NoExpand, Regex};
use std::path::PathBuf;
use std::sync::OnceLock;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::migrate::error::{IoContext, MigrationError};
use crate::workspace::env::{EnvConfig, EnvError};
use crate::workspace::Workspace;

pub const SAMPLE_CONFIG: &str = "web/wp/wp-config-sample.php";
pub const CONFIG: &str = "web/wp/wp-config.php";

/// Marker the sample config uses for every authentication key and salt.
pub const SECRET_PLACEHOLDER: &str = "put your unique phrase here";

const SECRET_LENGTH: usize = 64;
/// Printable ASCII without quotes, backslash or space, so a secret can sit
/// inside a single-quoted PHP string and never re-forms the placeholder.
const SECRET_CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()-_[]{}<>~`+=,.;:/?|";

fn debug_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"define\(\s*'WP_DEBUG'\s*,\s*(?:true|false)\s*\)").expect("valid WP_DEBUG pattern")
    })
}

fn table_prefix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$table_prefix\s*=\s*'[^']*'").expect("valid table prefix pattern")
    })
}

/// One substitution step over the config text.
enum Rule {
    Literal { token: &'static str, value: String },
    Pattern { pattern: &'static Regex, replacement: String },
}

impl Rule {
    fn apply(&self, text: String) -> String {
        match self {
            Rule::Literal { token, value } => text.replace(token, value),
            Rule::Pattern {
                pattern,
                replacement,
            } => pattern
                .replace_all(&text, NoExpand(replacement))
                .into_owned(),
        }
    }
}

/// Escape a value for a single-quoted PHP string.
fn php_quote_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Ordered substitutions for `env`. The host rule runs first so values
/// substituted later are never rewritten by the broad `localhost` token.
fn rules(env: &EnvConfig) -> Result<Vec<Rule>, EnvError> {
    let creds = env.db_credentials()?;

    let mut rules = vec![
        Rule::Literal {
            token: "localhost",
            value: php_quote_escape(&creds.host_spec()),
        },
        Rule::Literal {
            token: "database_name_here",
            value: php_quote_escape(&creds.name),
        },
        Rule::Literal {
            token: "username_here",
            value: php_quote_escape(&creds.user),
        },
        Rule::Literal {
            token: "password_here",
            value: php_quote_escape(&creds.password),
        },
        Rule::Pattern {
            pattern: debug_pattern(),
            replacement: format!("define( 'WP_DEBUG', {} )", env.is_development()),
        },
    ];

    if let Some(prefix) = env.table_prefix() {
        rules.push(Rule::Pattern {
            pattern: table_prefix_pattern(),
            replacement: format!("$table_prefix = '{}'", php_quote_escape(prefix)),
        });
    }

    Ok(rules)
}

fn generate_secret<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SECRET_LENGTH)
        .map(|_| SECRET_CHARSET[rng.gen_range(0..SECRET_CHARSET.len())] as char)
        .collect()
}

/// Replace each secret placeholder, one occurrence at a time, with its own
/// freshly generated secret.
pub fn fill_secrets<R: Rng + ?Sized>(text: String, rng: &mut R) -> String {
    let occurrences = text.matches(SECRET_PLACEHOLDER).count();
    (0..occurrences).fold(text, |text, _| {
        text.replacen(SECRET_PLACEHOLDER, &generate_secret(rng), 1)
    })
}

/// Render the sample config with values from `env`, using `rng` for secrets.
pub fn render_with<R: Rng + ?Sized>(
    template: &str,
    env: &EnvConfig,
    rng: &mut R,
) -> Result<String, EnvError> {
    let text = rules(env)?
        .iter()
        .fold(template.to_string(), |text, rule| rule.apply(text));
    Ok(fill_secrets(text, rng))
}

/// Render the sample config with values from `env`.
pub fn render(template: &str, env: &EnvConfig) -> Result<String, EnvError> {
    render_with(template, env, &mut rand::thread_rng())
}

/// Render `wp-config-sample.php` and write `wp-config.php`.
///
/// The text is complete before anything touches the destination: it is
/// written to a sibling temp file and renamed into place.
pub async fn write_config(
    workspace: &Workspace,
    env: &EnvConfig,
) -> Result<PathBuf, MigrationError> {
    let sample = workspace.resolve(SAMPLE_CONFIG);
    let template = tokio::fs::read_to_string(&sample).await.at(&sample)?;

    let text = render(&template, env)?;
    if text.contains(SECRET_PLACEHOLDER) {
        return Err(MigrationError::UnfilledSecrets);
    }

    let config = workspace.resolve(CONFIG);
    let temp_path = config.with_extension("php.tmp");
    {
        let mut temp_file = tokio::fs::File::create(&temp_path).await.at(&temp_path)?;
        temp_file.write_all(text.as_bytes()).await.at(&temp_path)?;
        temp_file.sync_all().await.at(&temp_path)?;
    }
    tokio::fs::rename(&temp_path, &config).await.at(&config)?;

    info!(path = %config.display(), "Wrote config");
    Ok(config)
}
