//! Response decoder: `bw` stdout to typed results.
//!
//! Three outcomes are kept apart: empty output after a successful exit,
//! output that is not the expected JSON, and valid JSON describing zero
//! results. Only the last one is a success.

use crate::bitwarden::command::Command;
use crate::bitwarden::encode::WireObject;
use crate::bitwarden::exec::ExecOutput;
use crate::bitwarden::types::*;
use serde::de::DeserializeOwned;

fn decode_error(command: &Command, reason: impl Into<String>, output: &str) -> BitwardenError {
    BitwardenError::decode(command.summary(), reason, output)
}

/// Parse stdout as JSON, treating blank output as truncated input.
fn parse<T: DeserializeOwned>(command: &Command, output: &ExecOutput) -> BitwardenResult<T> {
    let text = output.stdout_text();
    if text.trim().is_empty() {
        return Err(decode_error(command, UNEXPECTED_END_OF_INPUT, &text));
    }
    serde_json::from_str(&text).map_err(|e| decode_error(command, e.to_string(), &text))
}

fn into_object(command: &Command, wire: WireObject, output: &ExecOutput) -> BitwardenResult<Object> {
    Object::try_from(wire).map_err(|reason| decode_error(command, reason, &output.stdout_text()))
}

/// Decode a single object, as printed by `get`, `create` and `edit`.
pub fn decode_object(command: &Command, output: &ExecOutput) -> BitwardenResult<Object> {
    let wire: WireObject = parse(command, output)?;
    into_object(command, wire, output)
}

/// Decode a `list` response. `null` and `[]` both mean no results.
pub fn decode_objects(command: &Command, output: &ExecOutput) -> BitwardenResult<Vec<Object>> {
    let wire: Option<Vec<WireObject>> = parse(command, output)?;
    wire.unwrap_or_default()
        .into_iter()
        .map(|entry| into_object(command, entry, output))
        .collect()
}

pub fn decode_status(command: &Command, output: &ExecOutput) -> BitwardenResult<StatusInfo> {
    parse(command, output)
}

/// The session token printed by `unlock --raw`.
pub fn decode_session_token(command: &Command, output: &ExecOutput) -> BitwardenResult<String> {
    let text = output.stdout_text();
    let token = text.trim();
    if token.is_empty() {
        return Err(decode_error(command, UNEXPECTED_END_OF_INPUT, &text));
    }
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitwarden::command::{self, ListFilter};

    fn stdout(text: &str) -> ExecOutput {
        ExecOutput { stdout: text.as_bytes().to_vec(), stderr: String::new(), exit_code: Some(0) }
    }

    fn list_collections() -> Command {
        command::list("org-collection", &ListFilter::default())
    }

    #[test]
    fn empty_output_is_unexpected_end_of_input() {
        let err = decode_objects(&list_collections(), &stdout("")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unable to parse result of 'list org-collection', error: 'unexpected end of JSON input', output: ''"
        );
        assert_eq!(err.kind(), BitwardenErrorKind::Decode);
    }

    #[test]
    fn whitespace_output_is_unexpected_end_of_input() {
        let err = decode_objects(&list_collections(), &stdout("  \n")).unwrap_err();
        match err {
            BitwardenError::Decode { command, reason, output } => {
                assert_eq!(command, "list org-collection");
                assert_eq!(reason, UNEXPECTED_END_OF_INPUT);
                assert_eq!(output, "  \n");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn malformed_output_carries_raw_text() {
        let err = decode_objects(&list_collections(), &stdout("? Master password: [hidden]")).unwrap_err();
        match err {
            BitwardenError::Decode { output, reason, .. } => {
                assert_eq!(output, "? Master password: [hidden]");
                assert!(!reason.is_empty());
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn null_and_empty_list_are_zero_results() {
        let list = command::list("items", &ListFilter::default());
        assert!(decode_objects(&list, &stdout("null")).unwrap().is_empty());
        assert!(decode_objects(&list, &stdout("[]\n")).unwrap().is_empty());
    }

    #[test]
    fn list_entries_are_typed() {
        let list = command::list("items", &ListFilter::default());
        let json = r#"[
            {"object":"item","id":"a","name":"Login","type":1,
             "login":{"username":"u","password":"p","uris":[{"match":null,"uri":"https://example.com"}]},
             "secureNote":null,"fields":null,"collectionIds":[]},
            {"object":"item","id":"b","name":"Note","type":2,"notes":"n","secureNote":{"type":0},"login":null}
        ]"#;
        let objects = decode_objects(&list, &stdout(json)).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].item_type(), Some(ItemType::Login));
        let login = objects[0].as_item().unwrap().login().unwrap();
        assert_eq!(login.username.as_deref(), Some("u"));
        assert_eq!(login.uris[0].uri, "https://example.com");
        assert_eq!(objects[1].item_type(), Some(ItemType::SecureNote));
        assert_eq!(objects[1].as_item().unwrap().notes.as_deref(), Some("n"));
    }

    #[test]
    fn unknown_object_tag_is_a_decode_error() {
        let get = command::get(&Object::folder("").with_id("x")).unwrap();
        let err = decode_object(&get, &stdout(r#"{"object":"send","id":"x"}"#)).unwrap_err();
        assert_eq!(err.kind(), BitwardenErrorKind::Decode);
        assert!(err.to_string().contains("unknown object type 'send'"));
    }

    #[test]
    fn single_object_and_folder() {
        let get = command::get(&Object::folder("").with_id("f1")).unwrap();
        let folder = decode_object(&get, &stdout(r#"{"object":"folder","id":"f1","name":"Work"}"#)).unwrap();
        assert_eq!(folder, Object::folder("Work").with_id("f1"));
    }

    #[test]
    fn status_response() {
        let json = r#"{"serverUrl":null,"lastSync":"2024-01-01T00:00:00.000Z",
            "userEmail":"me@example.com","userId":"u1","status":"locked"}"#;
        let status = decode_status(&command::status(), &stdout(json)).unwrap();
        assert_eq!(status.vault_status(), VaultStatus::Locked);
        assert_eq!(status.user_email.as_deref(), Some("me@example.com"));
        assert_eq!(status.server_url, None);
    }

    #[test]
    fn session_token_is_trimmed() {
        let unlock = command::unlock("pw");
        assert_eq!(decode_session_token(&unlock, &stdout("abc123==\n")).unwrap(), "abc123==");
        let err = decode_session_token(&unlock, &stdout("\n")).unwrap_err();
        assert_eq!(err.kind(), BitwardenErrorKind::Decode);
        assert!(err.to_string().starts_with("unable to parse result of 'unlock --passwordenv'"));
    }
}
