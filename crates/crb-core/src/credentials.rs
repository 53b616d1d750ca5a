use std::{
    collections::BTreeMap,
    fmt,
    io::{BufRead, Write},
};

use crate::{
    errors::Error,
    store::{FileStore, Table},
    Result,
};

const OPENAI_API_KEY: &str = "openai_api_key";
const TELEGRAM_TOKEN: &str = "telegram_token";

/// Secrets needed to talk to the completion backend and Telegram.
///
/// Loaded once at startup; never mutated afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSet {
    pub openai_api_key: String,
    pub telegram_token: String,
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("openai_api_key", &"<redacted>")
            .field("telegram_token", &"<redacted>")
            .finish()
    }
}

impl CredentialSet {
    fn from_table(table: &BTreeMap<String, String>) -> Result<Self> {
        let get = |key: &str| {
            table
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Credentials(format!("`{key}` is missing or empty")))
        };
        Ok(Self {
            openai_api_key: get(OPENAI_API_KEY)?,
            telegram_token: get(TELEGRAM_TOKEN)?,
        })
    }

    fn to_table(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (OPENAI_API_KEY.to_string(), self.openai_api_key.clone()),
            (TELEGRAM_TOKEN.to_string(), self.telegram_token.clone()),
        ])
    }
}

/// Load credentials, or interactively collect and save them when the table is absent.
///
/// The bootstrap also asks for an admin password. Nothing reads it: the value is
/// discarded as soon as it is entered and is never persisted.
pub fn load_or_bootstrap(
    store: &FileStore,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<CredentialSet> {
    if store.exists(Table::Credentials) {
        let table = store.load::<String>(Table::Credentials)?;
        return CredentialSet::from_table(&table);
    }

    tracing::info!(
        "no credentials at {}; prompting",
        store.path(Table::Credentials).display()
    );
    let openai_api_key = prompt(input, output, "input openai api key: ")?;
    let telegram_token = prompt(input, output, "input telegram token: ")?;
    let _admin_password = prompt(input, output, "input admin password: ")?;

    let creds = CredentialSet::from_table(&BTreeMap::from([
        (OPENAI_API_KEY.to_string(), openai_api_key),
        (TELEGRAM_TOKEN.to_string(), telegram_token),
    ]))?;
    store.save(Table::Credentials, &creds.to_table())?;
    Ok(creds)
}

fn prompt(input: &mut impl BufRead, output: &mut impl Write, label: &str) -> Result<String> {
    output.write_all(label.as_bytes())?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(Error::Credentials(format!(
            "input closed while waiting for `{}`",
            label.trim_end_matches(": ")
        )));
    }
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn bootstrap_prompts_and_persists_two_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let mut input = Cursor::new("sk-test\n123:abc\nhunter2\n");
        let mut output: Vec<u8> = Vec::new();

        let creds = load_or_bootstrap(&store, &mut input, &mut output).unwrap();
        assert_eq!(creds.openai_api_key, "sk-test");
        assert_eq!(creds.telegram_token, "123:abc");

        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("openai api key"));
        assert!(shown.contains("telegram token"));
        assert!(shown.contains("admin password"));

        let saved = std::fs::read_to_string(store.path(Table::Credentials)).unwrap();
        assert!(saved.contains("sk-test"));
        assert!(!saved.contains("hunter2"));
    }

    #[test]
    fn existing_table_is_loaded_without_prompting() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let creds = CredentialSet {
            openai_api_key: "k".to_string(),
            telegram_token: "t".to_string(),
        };
        store.save(Table::Credentials, &creds.to_table()).unwrap();

        let mut input = Cursor::new("");
        let mut output: Vec<u8> = Vec::new();
        let loaded = load_or_bootstrap(&store, &mut input, &mut output).unwrap();
        assert_eq!(loaded, creds);
        assert!(output.is_empty());
    }

    #[test]
    fn closed_input_fails_bootstrap() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let mut input = Cursor::new("sk-only\n");
        let mut output: Vec<u8> = Vec::new();

        let err = load_or_bootstrap(&store, &mut input, &mut output).unwrap_err();
        assert!(matches!(err, Error::Credentials(_)));
        assert!(!store.exists(Table::Credentials));
    }

    #[test]
    fn incomplete_table_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let table = BTreeMap::from([(OPENAI_API_KEY.to_string(), "k".to_string())]);
        store.save(Table::Credentials, &table).unwrap();

        let mut output: Vec<u8> = Vec::new();
        let err = load_or_bootstrap(&store, &mut Cursor::new(""), &mut output).unwrap_err();
        assert!(matches!(err, Error::Credentials(_)));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let creds = CredentialSet {
            openai_api_key: "sk-secret".to_string(),
            telegram_token: "tok".to_string(),
        };
        let dbg = format!("{creds:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(!dbg.contains("tok"));
    }
}
