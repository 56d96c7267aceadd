use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Map, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::membership;
use crate::models;
use crate::routes::{auth, certificates, clubs, courses, enrolments, health, qualifications, regions, users};

#[derive(OpenApi)]
#[openapi(
	info(title = "Dive Registry API", description = "Membership, qualification and training records for diving clubs"),
	paths(
		health::health,
		auth::login,
		auth::logout,
		clubs::list_clubs,
		clubs::create_club,
		clubs::get_club,
		clubs::update_club,
		clubs::partial_update_club,
		clubs::delete_club,
		clubs::club_qualifications,
		clubs::club_users,
		clubs::dive_officers,
		regions::list_regions,
		regions::get_region,
		regions::create_region,
		regions::update_region,
		regions::delete_region,
		regions::active_instructors,
		regions::region_courses,
		users::list_users,
		users::me,
		users::create_user,
		users::get_user,
		users::update_user,
		users::partial_update_user,
		users::delete_user,
		users::membership_status,
		users::user_qualifications,
		users::courses_organized,
		users::courses_taught,
		users::list_committee_positions,
		users::adopt_committee_role,
		users::remove_committee_position,
		certificates::list_certificates,
		certificates::get_certificate,
		certificates::create_certificate,
		certificates::update_certificate,
		certificates::delete_certificate,
		qualifications::list_qualifications,
		qualifications::get_qualification,
		qualifications::create_qualification,
		qualifications::update_qualification,
		qualifications::delete_qualification,
		courses::list_courses,
		courses::get_course,
		courses::create_course,
		courses::update_course,
		courses::partial_update_course,
		courses::delete_course,
		courses::list_instructions,
		courses::create_instruction,
		courses::delete_instruction,
		enrolments::list_enrolments,
		enrolments::list_course_enrolments,
		enrolments::create_enrolment,
		enrolments::create_course_enrolment,
		enrolments::get_enrolment,
		enrolments::delete_enrolment
	),
	components(
		schemas(
			health::HealthResponse,
			auth::MessageResponse,
			membership::MembershipStatus,
			models::user::UserProfile,
			models::user::UserSummary,
			models::user::UserCreateRequest,
			models::user::UserUpdateRequest,
			models::user::LoginRequest,
			models::user::AuthResponse,
			models::club::ClubDetail,
			models::club::ClubSummary,
			models::club::ClubCreateRequest,
			models::club::ClubUpdateRequest,
			models::region::Region,
			models::region::RegionSummary,
			models::region::RegionCreateRequest,
			models::region::RegionUpdateRequest,
			models::committee::CommitteePosition,
			models::committee::AdoptRoleRequest,
			models::qualification::Certificate,
			models::qualification::CertificateSummary,
			models::qualification::CertificateCreateRequest,
			models::qualification::CertificateUpdateRequest,
			models::qualification::QualifiedUser,
			models::qualification::Qualification,
			models::qualification::QualificationCreateRequest,
			models::qualification::QualificationUpdateRequest,
			models::course::Course,
			models::course::CourseCreateRequest,
			models::course::CourseUpdateRequest,
			models::course::CourseEnrolment,
			models::course::EnrolmentCreateRequest,
			models::course::CourseInstruction,
			models::course::InstructionCreateRequest
		)
	),
	tags(
		(name = "Health", description = "Service health"),
		(name = "Auth", description = "Authentication endpoints"),
		(name = "Clubs", description = "Clubs and their members"),
		(name = "Regions", description = "Regions and regional reports"),
		(name = "Users", description = "Members, profiles and committee positions"),
		(name = "Certificates", description = "Certificate catalogue"),
		(name = "Qualifications", description = "Certificates granted to members"),
		(name = "Courses", description = "Training courses and instructors"),
		(name = "Enrolments", description = "Course enrolments")
	)
)]
pub struct ApiDoc;

/// Generated document with the bearer scheme, global security and a local
/// server entry for Swagger's "Try it out".
pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(ApiDoc::openapi())?;

	normalize_path_operations(&mut doc);
	ensure_security_components(&mut doc)?;
	ensure_global_security(&mut doc)?;
	add_examples(&mut doc);
	ensure_servers(&mut doc, port);

	Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.with_credentials(true)
		.persist_authorization(true);

	let doc_json = Arc::new(serde_json::to_value(&doc)?);

	let json_route = {
		let doc_json = Arc::clone(&doc_json);
		get(move || {
			let doc_json = Arc::clone(&doc_json);
			async move { Json((*doc_json).clone()) }
		})
	};

	Ok(Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config)))
}

fn root_object(doc: &mut Value) -> anyhow::Result<&mut Map<String, Value>> {
	doc.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("OpenAPI root must be an object"))
}

fn normalize_path_operations(doc: &mut Value) {
	if let Some(paths) = doc.get_mut("paths").and_then(Value::as_object_mut) {
		let snapshot = paths.clone();
		for (path, item) in snapshot {
			if let Some(ops) = item.as_object() {
				let mut normalized = Map::new();
				for (method, val) in ops {
					let key = method.to_lowercase();
					if let Some(existing) = normalized.get_mut(&key) {
						merge_values(existing, val);
					} else {
						normalized.insert(key, val.clone());
					}
				}
				paths.insert(path, Value::Object(normalized));
			}
		}
	}
}

fn ensure_security_components(doc: &mut Value) -> anyhow::Result<()> {
	let components = root_object(doc)?
		.entry("components")
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("components must be an object"))?;

	let schemes = components
		.entry("securitySchemes")
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("securitySchemes must be an object"))?;

	schemes.insert(
		"bearerAuth".to_string(),
		json!({
			"type": "http",
			"scheme": "bearer",
			"bearerFormat": "JWT"
		}),
	);
	Ok(())
}

fn ensure_global_security(doc: &mut Value) -> anyhow::Result<()> {
	root_object(doc)?
		.entry("security")
		.or_insert_with(|| json!([{ "bearerAuth": [] }]));
	Ok(())
}

fn add_examples(doc: &mut Value) {
	if let Some(paths) = doc.get_mut("paths").and_then(Value::as_object_mut) {
		for item in paths.values_mut() {
			if let Some(operations) = item.as_object_mut() {
				for operation in operations.values_mut() {
					apply_parameter_examples(operation);
					apply_request_examples(operation);
				}
			}
		}
	}
}

fn apply_parameter_examples(operation: &mut Value) {
	let Some(parameters) = operation.get_mut("parameters").and_then(Value::as_array_mut) else { return; };

	for parameter in parameters.iter_mut() {
		let is_id = parameter
			.get("name")
			.and_then(Value::as_str)
			.is_some_and(|name| name == "id" || name.ends_with("_id"));
		if let (true, Some(obj)) = (is_id, parameter.as_object_mut()) {
			obj.entry("example")
				.or_insert_with(|| json!("00000000-0000-0000-0000-000000000000"));
		}
	}
}

fn apply_request_examples(operation: &mut Value) {
	let Some(request_body) = operation.get_mut("requestBody") else { return; };
	let Some(content) = request_body.get_mut("content").and_then(Value::as_object_mut) else { return; };
	let Some(app_json) = content.get_mut("application/json").and_then(Value::as_object_mut) else { return; };
	let Some(schema) = app_json.get("schema").and_then(Value::as_object) else { return; };
	let Some(reference) = schema.get("$ref").and_then(Value::as_str) else { return; };

	let example = match reference {
		"#/components/schemas/ClubCreateRequest" => Some(json!({
			"name": "Galway Sub-Aqua Club",
			"region": "00000000-0000-0000-0000-000000000000"
		})),
		"#/components/schemas/UserCreateRequest" => Some(json!({
			"email": "ada@example.com",
			"first_name": "Ada",
			"last_name": "Lovelace",
			"password": "S3cureP@ssw0rd"
		})),
		"#/components/schemas/CourseCreateRequest" => Some(json!({
			"certificate": "00000000-0000-0000-0000-000000000000",
			"datetime": "2025-06-01T09:00:00Z",
			"location": "Lough Hyne",
			"maximum_participants": 8
		})),
		"#/components/schemas/AdoptRoleRequest" => Some(json!({ "role": 1 })),
		_ => None,
	};

	if let Some(example) = example {
		app_json.insert("example".to_string(), example);
	}
}

fn ensure_servers(doc: &mut Value, port: u16) {
	let server_url = format!("http://localhost:{}", port);

	match doc.get_mut("servers") {
		Some(Value::Array(arr)) => {
			let has = arr.iter().any(|v| v.get("url").and_then(Value::as_str) == Some(server_url.as_str()));
			if !has {
				arr.push(json!({ "url": server_url }));
			}
		}
		_ => {
			doc["servers"] = json!([{ "url": server_url }]);
		}
	}
}

fn merge_values(target: &mut Value, addition: &Value) {
	match (target, addition) {
		(Value::Object(dest), Value::Object(src)) => {
			for (key, value) in src {
				if let Some(existing) = dest.get_mut(key) {
					merge_values(existing, value);
				} else {
					dest.insert(key.clone(), value.clone());
				}
			}
		}
		(Value::Array(dest), Value::Array(src)) => {
			for item in src {
				if !dest.contains(item) {
					dest.push(item.clone());
				}
			}
		}
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn document_carries_bearer_scheme_and_server() {
		let doc = build_openapi(9000).expect("build openapi");
		let value = serde_json::to_value(&doc).expect("serialize");

		assert_eq!(value["components"]["securitySchemes"]["bearerAuth"]["scheme"], "bearer");
		assert_eq!(value["servers"][0]["url"], "http://localhost:9000");
		assert!(value["paths"]["/clubs/{id}"]["patch"].is_object());
		assert!(value["paths"]["/courses/{id}/enrolments"]["post"].is_object());
	}

	#[test]
	fn public_routes_opt_out_of_security() {
		let doc = build_openapi(8000).expect("build openapi");
		let value = serde_json::to_value(&doc).expect("serialize");

		assert_eq!(value["paths"]["/auth/login"]["post"]["security"], json!([{}]));
	}

	#[test]
	fn merge_values_appends_missing_array_items() {
		let mut target = json!({ "tags": ["a"], "nested": { "x": 1 } });
		merge_values(&mut target, &json!({ "tags": ["a", "b"], "nested": { "y": 2 } }));

		assert_eq!(target, json!({ "tags": ["a", "b"], "nested": { "x": 1, "y": 2 } }));
	}
}
