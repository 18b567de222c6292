#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use actix_web::{delete, get, patch, post, web, App, HttpResponse, HttpServer};
    use serde_json::{json, Value};

    use convo::api::models::Role;
    use convo::api::{ChatGateway, GatewayError, HttpGateway};
    use convo::identity::UserId;

    /// Request bodies and query strings seen by the stub backend.
    #[derive(Default)]
    struct Recorded {
        requests: Mutex<Vec<(String, Value)>>,
    }

    impl Recorded {
        fn push(&self, route: &str, value: Value) {
            self.requests.lock().unwrap().push((route.to_string(), value));
        }

        fn last(&self, route: &str) -> Option<Value> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|(r, _)| r == route)
                .map(|(_, v)| v.clone())
        }
    }

    #[post("/chat")]
    async fn chat(recorded: web::Data<Recorded>, body: web::Json<Value>) -> HttpResponse {
        let body = body.into_inner();
        recorded.push("chat", body.clone());

        if body["message"] == "explode" {
            return HttpResponse::InternalServerError().json(json!({
                "success": false,
                "message": "Failed to process message",
                "error": "model unavailable"
            }));
        }

        let conversation_id = body["conversationId"].as_str().unwrap_or("c-new").to_string();
        HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Message sent",
            "data": {
                "response": "Hi there",
                "conversationId": conversation_id
            }
        }))
    }

    #[get("/chat/conversations")]
    async fn list(
        recorded: web::Data<Recorded>,
        query: web::Query<HashMap<String, String>>,
    ) -> HttpResponse {
        recorded.push("list", json!(query.into_inner()));
        HttpResponse::Ok().json(json!({
            "success": true,
            "message": "ok",
            "data": [
                {"_id": "c1", "title": "First", "updatedAt": "2026-01-02T03:04:05Z"},
                {"_id": "c2", "title": "Second"}
            ]
        }))
    }

    #[get("/chat/conversations/{id}")]
    async fn fetch(id: web::Path<String>) -> HttpResponse {
        let id = id.into_inner();
        if id == "missing" {
            return HttpResponse::NotFound().json(json!({
                "success": false,
                "message": "Conversation not found"
            }));
        }
        HttpResponse::Ok().json(json!({
            "success": true,
            "message": "ok",
            "data": {
                "_id": id,
                "title": "First",
                "messages": [
                    {"role": "user", "content": "Hello", "timestamp": "2026-01-02T03:04:05Z"},
                    {"role": "model", "content": "Hi there", "timestamp": "2026-01-02T03:04:06Z"}
                ]
            }
        }))
    }

    #[delete("/chat/conversations/{id}")]
    async fn remove(recorded: web::Data<Recorded>, id: web::Path<String>) -> HttpResponse {
        recorded.push("delete", json!(id.into_inner()));
        HttpResponse::Ok().json(json!({"success": true, "message": "Conversation deleted"}))
    }

    #[delete("/chat/conversations")]
    async fn clear(
        recorded: web::Data<Recorded>,
        query: web::Query<HashMap<String, String>>,
    ) -> HttpResponse {
        recorded.push("clear", json!(query.into_inner()));
        HttpResponse::Ok().json(json!({"success": true, "message": "All conversations deleted"}))
    }

    #[patch("/chat/conversations/{id}")]
    async fn rename(
        recorded: web::Data<Recorded>,
        id: web::Path<String>,
        body: web::Json<Value>,
    ) -> HttpResponse {
        let id = id.into_inner();
        recorded.push("rename", json!({"id": id, "body": body.into_inner()}));
        if id == "locked" {
            return HttpResponse::Ok().json(json!({"success": false, "message": "Title update failed"}));
        }
        HttpResponse::Ok().json(json!({"success": true, "message": "Title updated"}))
    }

    #[post("/chat")]
    async fn broken_chat() -> HttpResponse {
        HttpResponse::BadGateway()
            .content_type("text/html")
            .body("<html><body>Bad gateway</body></html>")
    }

    async fn spawn_backend() -> (String, web::Data<Recorded>) {
        let recorded = web::Data::new(Recorded::default());
        let data = recorded.clone();

        let server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .service(
                    web::scope("/api")
                        .service(chat)
                        .service(list)
                        .service(clear)
                        .service(fetch)
                        .service(remove)
                        .service(rename),
                )
                .service(web::scope("/broken").service(broken_chat))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();

        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        (format!("http://{}", addr), recorded)
    }

    #[actix_web::test]
    async fn test_send_message_posts_camel_case_body() {
        let (root, recorded) = spawn_backend().await;
        let gateway = HttpGateway::new(format!("{}/api/", root));
        let user = UserId::new("user_42");

        let reply = gateway.send_message("Hello", None, Some(&user)).await.unwrap();
        assert_eq!(reply.response, "Hi there");
        assert_eq!(reply.conversation_id, "c-new");
        assert_eq!(
            recorded.last("chat").unwrap(),
            json!({"message": "Hello", "userId": "user_42"})
        );

        let reply = gateway.send_message("Again", Some("c9"), Some(&user)).await.unwrap();
        assert_eq!(reply.conversation_id, "c9");
        assert_eq!(recorded.last("chat").unwrap()["conversationId"], "c9");
    }

    #[actix_web::test]
    async fn test_failed_envelope_is_backend_error() {
        let (root, _recorded) = spawn_backend().await;
        let gateway = HttpGateway::new(format!("{}/api", root));

        let err = gateway.send_message("explode", None, None).await.unwrap_err();
        assert!(!err.is_transport());
        assert!(matches!(err, GatewayError::Backend(ref m) if m == "model unavailable"));

        let err = gateway.get_conversation("missing").await.unwrap_err();
        assert!(matches!(err, GatewayError::Backend(ref m) if m == "Conversation not found"));
    }

    #[actix_web::test]
    async fn test_unreadable_body_is_transport_error() {
        let (root, _recorded) = spawn_backend().await;
        let gateway = HttpGateway::new(format!("{}/broken", root));

        let err = gateway.send_message("Hello", None, None).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[actix_web::test]
    async fn test_unreachable_backend_is_transport_error() {
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let gateway = HttpGateway::new(format!("http://{}/api", addr));

        let err = gateway.get_conversations(None).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[actix_web::test]
    async fn test_list_passes_user_id_query() {
        let (root, recorded) = spawn_backend().await;
        let gateway = HttpGateway::new(format!("{}/api", root));

        let items = gateway
            .get_conversations(Some(&UserId::new("user_7")))
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "c1");
        assert!(items[0].updated_at.is_some());
        assert!(items[1].messages.is_empty());
        assert_eq!(recorded.last("list").unwrap(), json!({"userId": "user_7"}));

        gateway.get_conversations(None).await.unwrap();
        assert_eq!(recorded.last("list").unwrap(), json!({}));
    }

    #[actix_web::test]
    async fn test_get_conversation_decodes_messages() {
        let (root, _recorded) = spawn_backend().await;
        let gateway = HttpGateway::new(format!("{}/api", root));

        let conversation = gateway.get_conversation("c1").await.unwrap();
        assert_eq!(conversation.id, "c1");
        let roles: Vec<Role> = conversation.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Model]);
        assert_eq!(conversation.messages[1].content, "Hi there");
    }

    #[actix_web::test]
    async fn test_reserved_characters_stay_inside_the_id() {
        let (root, recorded) = spawn_backend().await;
        let gateway = HttpGateway::new(format!("{}/api", root));

        gateway
            .delete_conversation("../conversations?userId=someone")
            .await
            .unwrap();
        assert!(recorded.last("clear").is_none());
        assert!(recorded.last("delete").is_some());

        let err = gateway.delete_conversation("..").await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidId(_)));
        assert!(recorded.last("clear").is_none());
    }

    #[actix_web::test]
    async fn test_delete_rename_and_clear() {
        let (root, recorded) = spawn_backend().await;
        let gateway = HttpGateway::new(format!("{}/api", root));

        gateway.delete_conversation("c2").await.unwrap();
        assert_eq!(recorded.last("delete").unwrap(), json!("c2"));

        gateway.update_conversation_title("c1", "Renamed").await.unwrap();
        assert_eq!(
            recorded.last("rename").unwrap(),
            json!({"id": "c1", "body": {"title": "Renamed"}})
        );

        let err = gateway
            .update_conversation_title("locked", "Nope")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Backend(ref m) if m == "Title update failed"));

        gateway
            .clear_conversations(Some(&UserId::new("user_7")))
            .await
            .unwrap();
        assert_eq!(recorded.last("clear").unwrap(), json!({"userId": "user_7"}));
    }
}
