//! Object encoder: typed vault objects to and from the JSON shape `bw`
//! expects on its command line.
//!
//! The wire structs below declare their fields in the order they are
//! serialized. That order is part of the command-line contract (payloads
//! are compared byte-for-byte), so do not reorder them.

use crate::bitwarden::types::*;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Custom field as serialized by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireField {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(rename = "type", default)]
    pub field_type: u8,
    #[serde(default)]
    pub linked_id: Option<u32>,
}

/// Full-shape vault object as exchanged with the CLI.
///
/// `groups`, `login` and `secureNote` are always emitted, even when they
/// carry nothing for the object at hand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub collection_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "is_false")]
    pub favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub groups: Option<Vec<CollectionGroup>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    #[serde(default, deserialize_with = "nullable")]
    pub login: Login,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_history: Option<Vec<PasswordHistoryEntry>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "is_zero")]
    pub reprompt: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_date: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub secure_note: SecureNote,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<WireField>>,
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn is_zero(v: &u8) -> bool {
    *v == 0
}

fn non_empty<T>(v: &[T]) -> Option<Vec<T>>
where
    T: Clone,
{
    (!v.is_empty()).then(|| v.to_vec())
}

impl From<&Field> for WireField {
    fn from(field: &Field) -> Self {
        Self {
            name: Some(field.name.clone()),
            value: Some(field.value.clone()),
            field_type: field.field_type as u8,
            linked_id: field.linked_id,
        }
    }
}

impl TryFrom<WireField> for Field {
    type Error = String;

    fn try_from(wire: WireField) -> Result<Self, Self::Error> {
        let field_type = FieldType::from_u8(wire.field_type)
            .ok_or_else(|| format!("unknown field type {}", wire.field_type))?;
        Ok(Self {
            name: wire.name.unwrap_or_default(),
            value: wire.value.unwrap_or_default(),
            field_type,
            linked_id: wire.linked_id,
        })
    }
}

impl From<&Object> for WireObject {
    fn from(object: &Object) -> Self {
        let mut wire = WireObject {
            id: object.id.clone(),
            name: object.name.clone(),
            object: Some(object.object_type().as_str().to_string()),
            organization_id: object.organization_id.clone(),
            revision_date: object.revision_date.clone(),
            ..Default::default()
        };

        match &object.kind {
            ObjectKind::Item(item) => {
                wire.item_type = Some(item.data.item_type() as u8);
                match &item.data {
                    ItemData::Login(login) => wire.login = login.clone(),
                    ItemData::SecureNote(note) => wire.secure_note = note.clone(),
                    ItemData::Card(card) => wire.card = Some(card.clone()),
                    ItemData::Identity(identity) => wire.identity = Some(identity.clone()),
                }
                wire.attachments = non_empty(&item.attachments);
                wire.collection_ids = item.collection_ids.clone();
                wire.creation_date = item.creation_date.clone();
                wire.deleted_date = item.deleted_date.clone();
                wire.favorite = item.favorite;
                wire.folder_id = item.folder_id.clone();
                wire.notes = item.notes.clone();
                wire.password_history = non_empty(&item.password_history);
                wire.reprompt = item.reprompt;
                wire.fields = (!item.fields.is_empty())
                    .then(|| item.fields.iter().map(WireField::from).collect());
            }
            ObjectKind::Folder => {}
            ObjectKind::OrgCollection(collection) => {
                wire.external_id = collection.external_id.clone();
                wire.groups = Some(collection.groups.clone());
            }
        }
        wire
    }
}

impl TryFrom<WireObject> for Object {
    type Error = String;

    fn try_from(wire: WireObject) -> Result<Self, Self::Error> {
        let tag = wire.object.as_deref().unwrap_or_default();
        let object_type = ObjectType::from_tag(tag)
            .ok_or_else(|| format!("unknown object type '{}'", tag))?;

        let kind = match object_type {
            ObjectType::Item => {
                let code = wire.item_type.ok_or("item without a type")?;
                let item_type =
                    ItemType::from_u8(code).ok_or_else(|| format!("unknown item type {}", code))?;
                let data = match item_type {
                    ItemType::Login => ItemData::Login(wire.login),
                    ItemType::SecureNote => ItemData::SecureNote(wire.secure_note),
                    ItemType::Card => ItemData::Card(wire.card.unwrap_or_default()),
                    ItemType::Identity => ItemData::Identity(wire.identity.unwrap_or_default()),
                };
                let fields = wire
                    .fields
                    .unwrap_or_default()
                    .into_iter()
                    .map(Field::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                ObjectKind::Item(Item {
                    data,
                    folder_id: wire.folder_id,
                    collection_ids: wire.collection_ids,
                    notes: wire.notes,
                    favorite: wire.favorite,
                    reprompt: wire.reprompt,
                    fields,
                    attachments: wire.attachments.unwrap_or_default(),
                    password_history: wire.password_history.unwrap_or_default(),
                    creation_date: wire.creation_date,
                    deleted_date: wire.deleted_date,
                })
            }
            ObjectType::Folder => ObjectKind::Folder,
            ObjectType::OrgCollection => ObjectKind::OrgCollection(OrgCollection {
                external_id: wire.external_id,
                groups: wire.groups.unwrap_or_default(),
            }),
        };

        Ok(Object {
            id: wire.id,
            name: wire.name,
            organization_id: wire.organization_id,
            revision_date: wire.revision_date,
            kind,
        })
    }
}

/// Serialize an object to the JSON text the CLI expects.
pub fn encode_json(object: &Object) -> BitwardenResult<String> {
    object.validate()?;
    serde_json::to_string(&WireObject::from(object))
        .map_err(|e| BitwardenError::invalid(format!("unable to serialize object: {}", e)))
}

/// Serialize an object to the base64 payload passed to `create`/`edit`.
///
/// Padding is stripped; identical input always yields the identical string.
pub fn encode(object: &Object) -> BitwardenResult<String> {
    let json = encode_json(object)?;
    Ok(base64::engine::general_purpose::STANDARD_NO_PAD.encode(json.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login_with_test_field() -> Object {
        let mut object = Object::login("", Login::default());
        object.as_item_mut().unwrap().fields.push(Field::text("test", "passed"));
        object
    }

    #[test]
    fn login_item_payload_matches_cli_contract() {
        let payload = encode(&login_with_test_field()).unwrap();
        assert_eq!(
            payload,
            "eyJncm91cHMiOm51bGwsImxvZ2luIjp7fSwib2JqZWN0IjoiaXRlbSIsInNlY3VyZU5vdGUiOnt9LCJ0eXBlIjoxLCJmaWVsZHMiOlt7Im5hbWUiOiJ0ZXN0IiwidmFsdWUiOiJwYXNzZWQiLCJ0eXBlIjowLCJsaW5rZWRJZCI6bnVsbH1dfQ"
        );
    }

    #[test]
    fn encoding_is_deterministic() {
        let mut object = Object::login("github", Login::new("octocat", "hunter2"));
        {
            let item = object.as_item_mut().unwrap();
            item.fields.push(Field::hidden("token", "abc"));
            item.fields.push(Field::boolean("admin", true));
            item.collection_ids = vec!["c1".into(), "c2".into()];
        }
        let first = encode(&object).unwrap();
        for _ in 0..10 {
            assert_eq!(encode(&object).unwrap(), first);
        }
    }

    #[test]
    fn empty_sections_are_kept_and_empty_fields_dropped() {
        let json = encode_json(&Object::secure_note("note", "body")).unwrap();
        assert_eq!(
            json,
            r#"{"groups":null,"login":{},"name":"note","notes":"body","object":"item","secureNote":{},"type":2}"#
        );
    }

    #[test]
    fn folder_payload_has_fixed_shape() {
        let json = encode_json(&Object::folder("Work")).unwrap();
        assert_eq!(
            json,
            r#"{"groups":null,"login":{},"name":"Work","object":"folder","secureNote":{}}"#
        );
    }

    #[test]
    fn org_collection_payload_carries_groups() {
        let mut collection = Object::org_collection("org-id", "Team");
        if let ObjectKind::OrgCollection(c) = &mut collection.kind {
            c.groups.push(CollectionGroup { id: "g1".into(), read_only: true, hide_passwords: false });
        }
        let json = encode_json(&collection).unwrap();
        assert_eq!(
            json,
            r#"{"groups":[{"id":"g1","readOnly":true,"hidePasswords":false}],"login":{},"name":"Team","object":"org-collection","organizationId":"org-id","secureNote":{}}"#
        );
    }

    #[test]
    fn card_section_only_for_cards() {
        let card = Object::card(
            "Visa",
            Card { brand: Some("Visa".into()), number: Some("4111".into()), ..Default::default() },
        );
        let json = encode_json(&card).unwrap();
        assert!(json.starts_with(r#"{"card":{"brand":"Visa","number":"4111"},"groups":null"#));
        assert!(!json.contains("identity"));
    }

    #[test]
    fn invalid_field_is_rejected_before_encoding() {
        let mut object = Object::login("x", Login::default());
        object.as_item_mut().unwrap().fields.push(Field {
            name: "broken".into(),
            value: String::new(),
            field_type: FieldType::Linked,
            linked_id: None,
        });
        let err = encode(&object).unwrap_err();
        assert_eq!(err.kind(), BitwardenErrorKind::InvalidObject);
    }

    #[test]
    fn wire_object_converts_back() {
        let raw = r#"{
            "object": "item",
            "id": "abc",
            "organizationId": null,
            "folderId": "f1",
            "type": 1,
            "reprompt": 0,
            "name": "github",
            "notes": null,
            "favorite": false,
            "login": {"uris": [{"match": null, "uri": "https://github.com"}], "username": "octocat", "password": "hunter2", "totp": null, "passwordRevisionDate": null},
            "collectionIds": [],
            "fields": [{"name": "user", "value": null, "type": 3, "linkedId": 100}],
            "revisionDate": "2024-01-01T00:00:00.000Z",
            "creationDate": "2024-01-01T00:00:00.000Z",
            "deletedDate": null,
            "passwordHistory": null
        }"#;
        let wire: WireObject = serde_json::from_str(raw).unwrap();
        let object = Object::try_from(wire).unwrap();
        assert_eq!(object.id, "abc");
        assert_eq!(object.item_type(), Some(ItemType::Login));
        let item = object.as_item().unwrap();
        assert_eq!(item.folder_id.as_deref(), Some("f1"));
        assert_eq!(item.fields, vec![Field::linked("user", 100)]);
        let login = item.login().unwrap();
        assert_eq!(login.username.as_deref(), Some("octocat"));
        assert_eq!(login.uris[0].uri, "https://github.com");
    }

    #[test]
    fn wire_object_rejects_unknown_tags() {
        let wire: WireObject = serde_json::from_str(r#"{"object":"organization"}"#).unwrap();
        assert_eq!(
            Object::try_from(wire).unwrap_err(),
            "unknown object type 'organization'"
        );
        let wire: WireObject = serde_json::from_str(r#"{"object":"item","type":42}"#).unwrap();
        assert_eq!(Object::try_from(wire).unwrap_err(), "unknown item type 42");
    }
}
