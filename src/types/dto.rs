use serde::{Deserialize, Serialize};


/// Body of `POST /generate-excel`.
///
/// Credentials and query are used verbatim; nothing beyond presence and type
/// is checked.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct ExportRequest {
    pub db_user: String,
    pub db_password: String,
    pub db_host: String,
    pub db_name: String,
    pub query: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct ErrorBody {
    pub error: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct HelloResponse {
    #[serde(rename = "Test")]
    pub test: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_request_requires_every_field() {
        let missing_query = r#"{"db_user":"u","db_password":"p","db_host":"h","db_name":"d"}"#;
        assert!(serde_json::from_str::<ExportRequest>(missing_query).is_err());

        let wrong_type = r#"{"db_user":1,"db_password":"p","db_host":"h","db_name":"d","query":"q"}"#;
        assert!(serde_json::from_str::<ExportRequest>(wrong_type).is_err());
    }

    #[test]
    fn test_export_request_keeps_values_verbatim() {
        let body = r#"{"db_user":" u ","db_password":"p;'","db_host":"localhost","db_name":"shop","query":"SELECT id, price FROM items"}"#;
        let request: ExportRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.db_user, " u ");
        assert_eq!(request.db_password, "p;'");
        assert_eq!(request.query, "SELECT id, price FROM items");
    }

    #[test]
    fn test_hello_response_field_name() {
        let body = serde_json::to_value(HelloResponse {
            test: "Hello From App".to_string(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"Test": "Hello From App"}));
    }
}
