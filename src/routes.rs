use std::io::Write;
use std::path::PathBuf;

use actix_files::Files;
use actix_multipart::Multipart;
use actix_session::Session;
use actix_web::http::header::{self, ContentDisposition};
use actix_web::{Error, HttpRequest, HttpResponse, error, web};
use askama::Template;
use futures::{StreamExt, TryStreamExt};

use crate::config::AppConfig;
use crate::db::users::UserStore;
use crate::inference::classifier::Classifier;
use crate::models::{CredentialsForm, PredictionRecord};
use crate::remedies::{RemedyRecord, get_remedy};
use crate::report::generate_report;

const SESSION_USERNAME: &str = "username";
const SESSION_PREDICTION: &str = "prediction";

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate;

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    error: Option<&'static str>,
}

#[derive(Template)]
#[template(path = "signup.html")]
struct SignupTemplate {
    error: Option<&'static str>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    username: String,
}

#[derive(Template)]
#[template(path = "result.html")]
struct ResultTemplate {
    image: String,
    disease: String,
    confidence: f64,
    remedy: RemedyRecord,
    labels_json: String,
    values_json: String,
}

#[derive(Template)]
#[template(path = "confidence_chart.html")]
struct ChartTemplate {
    disease: String,
    confidence: f64,
    labels_json: String,
    values_json: String,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, static_dir: PathBuf) {
    cfg.service(web::resource("/").route(web::get().to(home)))
        .service(web::resource("/login_page").route(web::get().to(login_page)))
        .service(
            web::resource("/signup")
                .route(web::get().to(signup_page))
                .route(web::post().to(signup)),
        )
        .service(
            web::resource("/login")
                .route(web::get().to(login_page))
                .route(web::post().to(login)),
        )
        .service(web::resource("/dashboard").route(web::get().to(dashboard)))
        .service(web::resource("/predict").route(web::post().to(predict)))
        .service(web::resource("/report").route(web::get().to(report)))
        .service(web::resource("/confidence-chart").route(web::get().to(confidence_chart)))
        .service(web::resource("/result").route(web::get().to(result)))
        .service(web::resource("/logout").route(web::get().to(logout)))
        .service(Files::new("/static", static_dir));
}

fn render<T: Template>(template: &T) -> Result<HttpResponse, Error> {
    let body = template.render().map_err(error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body))
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

fn current_user(session: &Session) -> Option<String> {
    session.get(SESSION_USERNAME).ok().flatten()
}

fn current_prediction(session: &Session) -> Option<PredictionRecord> {
    session.get(SESSION_PREDICTION).ok().flatten()
}

async fn home() -> Result<HttpResponse, Error> {
    render(&HomeTemplate)
}

async fn login_page() -> Result<HttpResponse, Error> {
    render(&LoginTemplate { error: None })
}

async fn signup_page() -> Result<HttpResponse, Error> {
    render(&SignupTemplate { error: None })
}

async fn signup(
    users: web::Data<UserStore>,
    form: web::Form<CredentialsForm>,
) -> Result<HttpResponse, Error> {
    let created = users
        .create(&form.username, &form.password)
        .await
        .map_err(error::ErrorInternalServerError)?;

    if created {
        log::info!("created account for {}", form.username);
        Ok(redirect("/login_page"))
    } else {
        render(&SignupTemplate {
            error: Some("Username already exists!"),
        })
    }
}

async fn login(
    session: Session,
    users: web::Data<UserStore>,
    form: web::Form<CredentialsForm>,
) -> Result<HttpResponse, Error> {
    let verified = users
        .verify(&form.username, &form.password)
        .await
        .map_err(error::ErrorInternalServerError)?;

    if verified {
        session.insert(SESSION_USERNAME, &form.username)?;
        log::info!("{} logged in", form.username);
        Ok(redirect("/dashboard"))
    } else {
        // One generic message for unknown user and wrong password alike.
        render(&LoginTemplate {
            error: Some("Invalid credentials"),
        })
    }
}

async fn dashboard(session: Session) -> Result<HttpResponse, Error> {
    match current_user(&session) {
        Some(username) => render(&DashboardTemplate { username }),
        None => Ok(redirect("/")),
    }
}

async fn predict(
    req: HttpRequest,
    session: Session,
    mut payload: Multipart,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, Error> {
    let Some(username) = current_user(&session) else {
        return Ok(redirect("/"));
    };

    let mut filename = None;
    let mut image_data = Vec::new();
    while let Ok(Some(mut field)) = payload.try_next().await {
        if field.name() != Some("image") {
            continue;
        }
        filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(sanitize_filename);
        while let Some(chunk) = field.next().await {
            let data = chunk?;
            image_data.write_all(&data)?;
        }
    }

    let filename = match filename {
        Some(name) if !name.is_empty() && !image_data.is_empty() => name,
        _ => {
            return Ok(HttpResponse::Ok()
                .content_type("text/plain; charset=utf-8")
                .body("No image selected"));
        }
    };

    // Looked up only once there is something to classify, so the early
    // exits above do not depend on a loaded model.
    let classifier = req
        .app_data::<web::Data<Classifier>>()
        .ok_or_else(|| error::ErrorInternalServerError("classifier not configured"))?;

    let filepath = config.upload_dir.join(&filename);
    std::fs::write(&filepath, &image_data)?;

    let prediction = classifier.classify(&filepath).map_err(|e| {
        log::error!("inference failed for {}: {}", filepath.display(), e);
        error::ErrorInternalServerError(e)
    })?;
    log::info!(
        "{} classified {} as {} ({}%)",
        username,
        filename,
        prediction.label,
        prediction.confidence
    );

    let record = PredictionRecord {
        username,
        filename,
        disease: prediction.label.clone(),
        confidence: prediction.confidence,
        remedy: get_remedy(&prediction.label),
        labels: classifier.labels().to_vec(),
        values: prediction.probabilities,
    };
    session.insert(SESSION_PREDICTION, &record)?;

    render_result(&record)
}

async fn report(session: Session, config: web::Data<AppConfig>) -> Result<HttpResponse, Error> {
    let Some(record) = current_prediction(&session) else {
        return Ok(redirect("/dashboard"));
    };

    let path = generate_report(&record, &config.upload_dir, &config.report_dir)
        .map_err(error::ErrorInternalServerError)?;
    let bytes = std::fs::read(&path)?;
    let download_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("report.pdf")
        .to_string();

    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header(ContentDisposition::attachment(download_name))
        .body(bytes))
}

async fn confidence_chart(session: Session) -> Result<HttpResponse, Error> {
    let Some(record) = current_prediction(&session) else {
        return Ok(redirect("/dashboard"));
    };

    render(&ChartTemplate {
        disease: record.disease,
        confidence: record.confidence,
        labels_json: to_json(&record.labels)?,
        values_json: to_json(&record.values)?,
    })
}

async fn result(session: Session) -> Result<HttpResponse, Error> {
    match current_prediction(&session) {
        Some(record) => render_result(&record),
        None => Ok(redirect("/dashboard")),
    }
}

async fn logout(session: Session) -> HttpResponse {
    session.purge();
    redirect("/")
}

fn render_result(record: &PredictionRecord) -> Result<HttpResponse, Error> {
    render(&ResultTemplate {
        image: record.filename.clone(),
        disease: record.disease.clone(),
        confidence: record.confidence,
        remedy: record.remedy.clone(),
        labels_json: to_json(&record.labels)?,
        values_json: to_json(&record.values)?,
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, Error> {
    serde_json::to_string(value).map_err(error::ErrorInternalServerError)
}

/// Strips any path components and reduces the rest to `[A-Za-z0-9._-]`,
/// after werkzeug's secure_filename. Different users uploading the same
/// filename still collide; that matches the historical behavior.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_matches('.').to_string()
}
