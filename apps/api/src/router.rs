use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use doctor_cell::router::doctor_routes;
use patient_cell::router::patient_routes;
use shared_utils::AppState;

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(doctor_routes(state.clone()))
        .merge(patient_routes(state.clone()))
        .merge(appointment_routes(state));

    Router::new()
        .route("/", get(|| async { "MedSchedule API is running!" }))
        .nest("/api", api)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{self, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use shared_utils::admin::ADMIN_PASSWORD_HEADER;
    use shared_utils::test_utils::{SchedulingFixture, TEST_ADMIN_PASSWORD};

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post_json(uri: &str, payload: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_liveness() {
        let fixture = SchedulingFixture::new().await;
        let app = create_router(fixture.state.clone());

        let response = app.oneshot(Request::builder().uri("/").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"MedSchedule API is running!");
    }

    #[tokio::test]
    async fn test_booking_flow_across_cells() {
        let fixture = SchedulingFixture::new().await;
        let app = create_router(fixture.state.clone());

        let slots_uri = format!("/api/available-slots?doctor_id={}&date=2099-01-05", fixture.doctor.id);
        let (_, slots) = send(&app, Request::builder().uri(&slots_uri).body(Body::empty()).unwrap()).await;
        assert_eq!(slots.as_array().unwrap().len(), 16);

        let (status, created) = send(&app, post_json("/api/appointments", json!({
            "doctorId": fixture.doctor.id,
            "firstName": "Jane",
            "lastName": "Doe",
            "email": "jane@example.com",
            "dateTime": "2099-01-05T10:00:00"
        }))).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, slots) = send(&app, Request::builder().uri(&slots_uri).body(Body::empty()).unwrap()).await;
        assert_eq!(slots.as_array().unwrap().len(), 15);

        let id = created["id"].as_str().unwrap();
        send(&app, post_json(&format!("/api/appointments/{}/complete", id), json!({}))).await;

        let (_, listed) = send(&app, Request::builder()
            .uri("/api/appointments?email=jane@example.com")
            .body(Body::empty())
            .unwrap()).await;
        assert_eq!(listed[0]["can_review"], true);

        let (status, _) = send(&app, post_json("/api/reviews", json!({
            "appointmentId": id,
            "doctorId": fixture.doctor.id,
            "patientId": fixture.store().find_patient_by_email("jane@example.com").await.unwrap().unwrap().id,
            "rating": 5
        }))).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, patients) = send(&app, Request::builder()
            .uri("/api/admin/patients")
            .header(ADMIN_PASSWORD_HEADER, TEST_ADMIN_PASSWORD)
            .body(Body::empty())
            .unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patients[0]["appointment_count"], 1);
    }
}
