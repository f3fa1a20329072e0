//! JSON-RPC client for an Odoo server.
//!
//! Every request is a `call` on `/jsonrpc`:
//!
//! ```text
//! {"jsonrpc": "2.0", "method": "call", "id": N,
//!  "params": {"service": "object", "method": "execute_kw",
//!             "args": [db, uid, password, model, method, args, kwargs]}}
//! ```
//!
//! The client logs in once when connecting; all later calls reuse the uid.

use super::{AUDIT_FIELDS, Deployment, FieldDoc, Lookup, LookupError, MetadataSource, ModuleInfo};
use crate::config::OdooConfig;
use crate::reference::{FieldText, MenuText};
use crate::{debug, log};
use anyhow::{Context, Result, bail};
use base64::Engine;
use serde_json::{Value, json};
use std::{
    cell::Cell,
    collections::{BTreeMap, HashMap},
    time::Duration,
};
use ureq::Agent;

/// Authenticated connection to an Odoo database.
pub struct OdooRpc {
    agent: Agent,
    endpoint: String,
    db: String,
    password: String,
    uid: i64,
    next_id: Cell<u64>,
}

impl OdooRpc {
    /// Connect and log in. Failing to reach the server or to authenticate
    /// is fatal.
    pub fn connect(config: &OdooConfig) -> Result<Self> {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout)))
            .build()
            .into();

        let mut rpc = Self {
            agent,
            endpoint: config.endpoint(),
            db: config.db.clone(),
            password: config.password.clone(),
            uid: 0,
            next_id: Cell::new(1),
        };

        let reply = rpc
            .call("common", "login", json!([config.db, config.user, config.password]))
            .with_context(|| format!("Failed to reach {}", rpc.endpoint))?;
        rpc.uid = match reply {
            Value::Number(uid) => uid.as_i64().unwrap_or_default(),
            _ => 0,
        };
        if rpc.uid <= 0 {
            bail!(
                "Authentication failed for user `{}` on database `{}`",
                config.user,
                config.db
            );
        }

        log!("odoo"; "connected to {} as {} (uid {})", config.server, config.user, rpc.uid);
        Ok(rpc)
    }

    fn call(&self, service: &str, method: &str, args: Value) -> Lookup<Value> {
        let id = self.next_id.replace(self.next_id.get() + 1);
        let body = request_body(id, service, method, args);

        let reply: Value = self
            .agent
            .post(self.endpoint.as_str())
            .send_json(&body)
            .map_err(|err| LookupError::Transport(err.to_string()))?
            .body_mut()
            .read_json()
            .map_err(|err| LookupError::Decode(err.to_string()))?;

        parse_reply(reply)
    }

    fn execute_kw(&self, model: &str, method: &str, args: Value, kwargs: Value) -> Lookup<Value> {
        debug!("rpc"; "{model}.{method} {args}");
        self.call(
            "object",
            "execute_kw",
            json!([self.db, self.uid, self.password, model, method, args, kwargs]),
        )
    }

    fn search_read(
        &self,
        model: &str,
        domain: Value,
        fields: &[&str],
        limit: Option<usize>,
        locale: Option<&str>,
    ) -> Lookup<Vec<Value>> {
        let mut kwargs = json!({ "fields": fields });
        if let Some(limit) = limit {
            kwargs["limit"] = json!(limit);
        }
        if let Some(locale) = locale {
            kwargs["context"] = json!({ "lang": locale });
        }
        records(self.execute_kw(model, "search_read", json!([domain]), kwargs)?)
    }

    fn read(&self, model: &str, ids: &[i64], fields: &[&str], locale: Option<&str>) -> Lookup<Vec<Value>> {
        let mut kwargs = json!({ "fields": fields });
        if let Some(locale) = locale {
            kwargs["context"] = json!({ "lang": locale });
        }
        records(self.execute_kw(model, "read", json!([ids]), kwargs)?)
    }

    fn fields_get(&self, model: &str, fields: Option<&[String]>, locale: &str) -> Lookup<Value> {
        let allfields = fields.map_or_else(|| json!([]), |fields| json!(fields));
        self.execute_kw(
            model,
            "fields_get",
            json!([allfields]),
            json!({ "attributes": ["string", "help"], "context": { "lang": locale } }),
        )
    }
}

impl MetadataSource for OdooRpc {
    fn lookup_field(&self, model: &str, field: &str, text: FieldText, locale: &str) -> Lookup {
        let field = field.to_owned();
        let reply = self.fields_get(model, Some(std::slice::from_ref(&field)), locale)?;
        let key = match text {
            FieldText::Label => "string",
            FieldText::Help => "help",
        };
        text_value(&reply[field.as_str()][key]).ok_or(LookupError::NotFound)
    }

    fn lookup_menu(&self, module: &str, menu: &str, text: MenuText, locale: &str) -> Lookup {
        let data = self.search_read(
            "ir.model.data",
            json!([["module", "=", module], ["name", "=", menu]]),
            &["res_id", "model"],
            Some(1),
            None,
        )?;
        let res_id = single(&data)?["res_id"]
            .as_i64()
            .ok_or_else(|| LookupError::Decode("ir.model.data without res_id".into()))?;

        let key = match text {
            MenuText::Breadcrumb => "complete_name",
            MenuText::NameOnly => "name",
        };
        let menus = self.read("ir.ui.menu", &[res_id], &[key], Some(locale))?;
        text_value(&single(&menus)?[key]).ok_or(LookupError::NotFound)
    }

    fn lookup_model(&self, model: &str, locale: &str) -> Lookup {
        let found = self.search_read(
            "ir.model",
            json!([["model", "=", model]]),
            &["name"],
            Some(2),
            Some(locale),
        )?;
        text_value(&single(&found)?["name"]).ok_or(LookupError::NotFound)
    }

    fn lookup_field_docs(
        &self,
        model: &str,
        fields: Option<&[String]>,
        locale: &str,
    ) -> Lookup<Vec<FieldDoc>> {
        let reply = self.fields_get(model, fields, locale)?;
        field_docs(&reply, fields)
    }
}

impl Deployment for OdooRpc {
    fn installed_modules(&self) -> Lookup<Vec<ModuleInfo>> {
        let modules = self.search_read(
            "ir.module.module",
            json!([["state", "=", "installed"]]),
            &["name", "dependencies_id"],
            None,
            None,
        )?;

        let dependency_ids: Vec<i64> = modules
            .iter()
            .flat_map(|module| ids(&module["dependencies_id"]))
            .collect();
        let names: HashMap<i64, String> = if dependency_ids.is_empty() {
            HashMap::new()
        } else {
            self.read("ir.module.module.dependency", &dependency_ids, &["name"], None)?
                .iter()
                .filter_map(|dep| Some((dep["id"].as_i64()?, text_value(&dep["name"])?)))
                .collect()
        };

        modules
            .iter()
            .map(|module| {
                let name = text_value(&module["name"])
                    .ok_or_else(|| LookupError::Decode("module without name".into()))?;
                let depends = ids(&module["dependencies_id"])
                    .filter_map(|id| names.get(&id).cloned())
                    .collect();
                Ok(ModuleInfo { name, depends })
            })
            .collect()
    }

    fn company_logo(&self) -> Lookup<Option<Vec<u8>>> {
        let users = self.read("res.users", &[self.uid], &["company_id"], None)?;
        // many2one values come back as `[id, display_name]`
        let Some(company_id) = single(&users)?["company_id"][0].as_i64() else {
            return Ok(None);
        };
        let companies = self.read("res.company", &[company_id], &["logo"], None)?;
        single(&companies)?["logo"]
            .as_str()
            .map(decode_binary)
            .transpose()
    }
}

// ============================================================================
// Wire helpers
// ============================================================================

fn request_body(id: u64, service: &str, method: &str, args: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "call",
        "params": { "service": service, "method": method, "args": args },
        "id": id,
    })
}

/// Extract `result`, or turn the `error` object into [`LookupError::Remote`].
fn parse_reply(mut reply: Value) -> Lookup<Value> {
    if let Some(error) = reply.get("error") {
        let message = error["data"]["message"]
            .as_str()
            .or_else(|| error["message"].as_str())
            .unwrap_or("unknown error");
        return Err(LookupError::Remote(message.to_owned()));
    }
    match reply.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(LookupError::Decode("reply has neither result nor error".into())),
    }
}

fn records(value: Value) -> Lookup<Vec<Value>> {
    match value {
        Value::Array(records) => Ok(records),
        other => Err(LookupError::Decode(format!("expected a record list, got {other}"))),
    }
}

fn single(records: &[Value]) -> Lookup<&Value> {
    match records {
        [] => Err(LookupError::NotFound),
        [record] => Ok(record),
        _ => Err(LookupError::Ambiguous(records.len())),
    }
}

/// Non-empty string value. Odoo sends `false` for unset fields.
fn text_value(value: &Value) -> Option<String> {
    value.as_str().filter(|s| !s.is_empty()).map(str::to_owned)
}

fn ids(value: &Value) -> impl Iterator<Item = i64> + '_ {
    value.as_array().into_iter().flatten().filter_map(Value::as_i64)
}

fn decode_binary(data: &str) -> Lookup<Vec<u8>> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|err| LookupError::Decode(err.to_string()))
}

fn field_docs(reply: &Value, fields: Option<&[String]>) -> Lookup<Vec<FieldDoc>> {
    let Some(all) = reply.as_object() else {
        return Err(LookupError::Decode("fields_get did not return an object".into()));
    };
    if all.is_empty() {
        return Err(LookupError::NotFound);
    }

    let names: Vec<&str> = match fields {
        Some(fields) => fields.iter().map(String::as_str).collect(),
        None => {
            let sorted: BTreeMap<&str, ()> = all.keys().map(|k| (k.as_str(), ())).collect();
            sorted.into_keys().collect()
        }
    };

    Ok(names
        .into_iter()
        .filter(|name| !AUDIT_FIELDS.contains(name))
        .filter_map(|name| {
            let attrs = all.get(name)?;
            Some(FieldDoc {
                name: name.to_owned(),
                label: text_value(&attrs["string"]),
                help: text_value(&attrs["help"]),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = request_body(7, "common", "login", json!(["db", "admin", "pwd"]));
        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["method"], "call");
        assert_eq!(body["id"], 7);
        assert_eq!(body["params"]["service"], "common");
        assert_eq!(body["params"]["args"][1], "admin");
    }

    #[test]
    fn test_parse_reply_result() {
        let reply = json!({"jsonrpc": "2.0", "id": 1, "result": {"name": {"string": "Name"}}});
        assert_eq!(parse_reply(reply).unwrap()["name"]["string"], "Name");
    }

    #[test]
    fn test_parse_reply_error() {
        let reply = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {
                "code": 200,
                "message": "Odoo Server Error",
                "data": {"name": "except_orm", "message": "Access Denied"}
            }
        });
        assert_eq!(
            parse_reply(reply),
            Err(LookupError::Remote("Access Denied".into()))
        );
        assert!(matches!(
            parse_reply(json!({"jsonrpc": "2.0"})),
            Err(LookupError::Decode(_))
        ));
    }

    #[test]
    fn test_single_record() {
        assert_eq!(single(&[]), Err(LookupError::NotFound));
        assert_eq!(single(&[json!(1), json!(2)]), Err(LookupError::Ambiguous(2)));
        assert_eq!(single(&[json!({"id": 3})]).unwrap()["id"], 3);
    }

    #[test]
    fn test_text_value_treats_false_as_unset() {
        assert_eq!(text_value(&json!("Name")), Some("Name".into()));
        assert_eq!(text_value(&json!(false)), None);
        assert_eq!(text_value(&json!("")), None);
        assert_eq!(text_value(&Value::Null), None);
    }

    #[test]
    fn test_field_docs_all_fields_sorted_without_audit() {
        let reply = json!({
            "write_date": {"string": "Last Updated on"},
            "name": {"string": "Name", "help": false},
            "vat": {"string": "TIN", "help": "Tax Identification Number"},
            "create_uid": {"string": "Created by"},
        });
        let docs = field_docs(&reply, None).unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["name", "vat"]);
        assert_eq!(docs[0].help, None);
        assert_eq!(docs[1].help.as_deref(), Some("Tax Identification Number"));
    }

    #[test]
    fn test_field_docs_keeps_requested_order() {
        let reply = json!({
            "name": {"string": "Name"},
            "vat": {"string": "TIN"},
        });
        let requested = vec!["vat".to_owned(), "missing".to_owned(), "name".to_owned()];
        let docs = field_docs(&reply, Some(&requested)).unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["vat", "name"]);
    }

    #[test]
    fn test_field_docs_empty_is_not_found() {
        assert_eq!(field_docs(&json!({}), None), Err(LookupError::NotFound));
    }

    #[test]
    fn test_decode_binary_ignores_line_breaks() {
        assert_eq!(decode_binary("aGVs\nbG8=\n").unwrap(), b"hello");
        assert!(matches!(decode_binary("***"), Err(LookupError::Decode(_))));
    }

    #[test]
    fn test_ids_of_one2many() {
        let collected: Vec<_> = ids(&json!([4, 8, 15])).collect();
        assert_eq!(collected, [4, 8, 15]);
        assert_eq!(ids(&json!(false)).count(), 0);
    }
}
