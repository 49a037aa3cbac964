use actix_identity::Identity;
use actix_session::Session;
use actix_web::{
    get, post,
    web::{self, Data},
    HttpMessage, HttpRequest, HttpResponse, Responder,
};
use serde::Deserialize;

use crate::{
    db,
    errors::AppError,
    forms::ReceiptForm,
    items,
    pdf::{self, ReceiptDocument},
    structs::{BusinessSettings, Receipt},
    utils, AppState, TEMPLATES,
};
use tera::Context;

const RECENT_LIMIT: i64 = 10;

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header(("Location", location))
        .finish()
}

fn base_context(state: &AppState, session: &Session) -> Context {
    let mut context = Context::new();
    context.insert("version", env!("CARGO_PKG_VERSION"));
    context.insert("features", &state.features);
    if let Some(flash) = utils::take_flash(session) {
        context.insert("flash", &flash);
    }
    context
}

fn render(template: &str, context: &Context) -> Result<HttpResponse, AppError> {
    let rendered = TEMPLATES.render(template, context).map_err(|e| {
        log::error!("Failed to render template {}: {}", template, e);
        AppError::TemplateError(e)
    })?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(rendered))
}

fn now_stamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M").to_string()
}

#[get("/")]
pub async fn index_handler(identity: Option<Identity>) -> impl Responder {
    match utils::identity_user_id(identity.as_ref()) {
        Some(_) => redirect("/home"),
        None => redirect("/login"),
    }
}

#[get("/home")]
pub async fn home_handler(
    state: Data<AppState>,
    session: Session,
    identity: Option<Identity>,
) -> Result<impl Responder, AppError> {
    if utils::identity_user_id(identity.as_ref()).is_none() {
        return Ok(redirect("/login"));
    }

    let mut context = base_context(&state, &session);
    context.insert("title", "New receipt");
    context.insert("settings", &utils::business_settings(&session));
    render("form.html", &context)
}

#[derive(Deserialize)]
pub struct Login {
    username: String,
    password: String,
}

#[get("/login")]
pub async fn login_handler(
    state: Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    let mut context = base_context(&state, &session);
    context.insert("title", "Log in");
    render("login.html", &context)
}

#[post("/login")]
pub async fn login_form_handler(
    web::Form(form): web::Form<Login>,
    state: Data<AppState>,
    session: Session,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    if form.username.is_empty() || form.password.is_empty() {
        utils::flash(&session, "danger", "All fields are required.");
        return Ok(redirect("/login"));
    }

    let user = db::find_user_by_username(&state.db_pool, &form.username)
        .await
        .map_err(|e| {
            log::error!("Failed to look up user: {}", e);
            AppError::DatabaseError(e)
        })?;

    match user {
        Some(user) if utils::verify_password(&form.password, &user.pwd_hash) => {
            Identity::login(&request.extensions(), user.id.to_string())?;
            Ok(redirect("/home"))
        }
        _ => {
            utils::flash(&session, "danger", "Invalid username or password.");
            Ok(redirect("/login"))
        }
    }
}

#[derive(Deserialize)]
pub struct Register {
    username: String,
    password: String,
    password2: String,
}

#[get("/register")]
pub async fn register_handler(
    state: Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    let mut context = base_context(&state, &session);
    context.insert("title", "Register");
    render("register.html", &context)
}

#[post("/register")]
pub async fn register_form_handler(
    web::Form(form): web::Form<Register>,
    state: Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    if form.username.is_empty() || form.password.is_empty() || form.password2.is_empty() {
        utils::flash(&session, "danger", "All fields are required.");
        return Ok(redirect("/register"));
    }
    if form.password != form.password2 {
        utils::flash(&session, "danger", "Passwords do not match.");
        return Ok(redirect("/register"));
    }
    if form.password.len() < 8 {
        utils::flash(&session, "danger", "Password must be at least 8 characters long.");
        return Ok(redirect("/register"));
    }

    match db::create_user(&state.db_pool, &form.username, &form.password).await {
        Ok(_) => {
            utils::flash(&session, "success", "Registration successful! You can now log in.");
            Ok(redirect("/login"))
        }
        Err(AppError::UsernameTaken) => {
            utils::flash(
                &session,
                "danger",
                "Username already exists. Please choose another.",
            );
            Ok(redirect("/register"))
        }
        Err(e) => Err(e),
    }
}

#[get("/logout")]
pub async fn logout_handler(identity: Option<Identity>) -> impl Responder {
    if let Some(identity) = identity {
        identity.logout();
    }
    redirect("/login")
}

#[post("/generate")]
pub async fn generate_handler(
    web::Form(pairs): web::Form<Vec<(String, String)>>,
    state: Data<AppState>,
    session: Session,
    identity: Option<Identity>,
) -> Result<impl Responder, AppError> {
    let Some(user_id) = utils::identity_user_id(identity.as_ref()) else {
        return Ok(redirect("/login"));
    };

    let form = ReceiptForm::from_pairs(pairs);
    let normalized = items::normalize(&form.entries);
    let date = now_stamp();

    let receipt_id =
        db::create_receipt(&state.db_pool, user_id, &form.client_name, &form.entries, &date)
            .await?;

    let business_name = display_business_name(&form.business_name, &session);

    let mut context = base_context(&state, &session);
    context.insert("title", "Receipt");
    context.insert("business_name", &business_name);
    context.insert("client_name", &form.client_name);
    context.insert("client_email", &form.client_email);
    context.insert("items", &normalized.display_items());
    context.insert("total", &normalized.display_total());
    context.insert("date", &date);
    context.insert("receipt_id", &receipt_id);
    render("receipt.html", &context)
}

#[post("/download-pdf")]
pub async fn download_pdf_handler(
    web::Form(pairs): web::Form<Vec<(String, String)>>,
    session: Session,
    identity: Option<Identity>,
) -> Result<impl Responder, AppError> {
    if utils::identity_user_id(identity.as_ref()).is_none() {
        return Ok(redirect("/login"));
    }

    let form = ReceiptForm::from_pairs(pairs);
    let normalized = items::normalize(&form.entries);
    let display_items = normalized.display_items();
    let business_name = display_business_name(&form.business_name, &session);

    let bytes = pdf::render_receipt_pdf(&ReceiptDocument {
        business_name: &business_name,
        client_name: &form.client_name,
        date: &now_stamp(),
        receipt_id: None,
        items: &display_items,
        total: &normalized.display_total(),
    })?;

    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .append_header(("Content-Disposition", "attachment; filename=receipt.pdf"))
        .body(bytes))
}

#[get("/receipt/{receipt_id}")]
pub async fn view_receipt_handler(
    path: web::Path<i64>,
    state: Data<AppState>,
    session: Session,
    identity: Option<Identity>,
) -> Result<impl Responder, AppError> {
    let Some(user_id) = utils::identity_user_id(identity.as_ref()) else {
        return Ok(redirect("/login"));
    };
    let receipt = fetch_owned_receipt(&state, path.into_inner(), user_id).await?;

    let normalized = items::normalize(&receipt.entries());
    let settings = utils::business_settings(&session);

    let mut context = base_context(&state, &session);
    context.insert("title", "Receipt");
    context.insert("business_name", &settings.business_name);
    context.insert("client_name", &receipt.client_name);
    context.insert("items", &normalized.display_items());
    context.insert("total", &normalized.display_total());
    context.insert("date", &receipt.created_at);
    context.insert("receipt_id", &receipt.id);
    render("view_receipt.html", &context)
}

#[get("/receipt/{receipt_id}/pdf")]
pub async fn receipt_pdf_handler(
    path: web::Path<i64>,
    state: Data<AppState>,
    session: Session,
    identity: Option<Identity>,
) -> Result<impl Responder, AppError> {
    let Some(user_id) = utils::identity_user_id(identity.as_ref()) else {
        return Ok(redirect("/login"));
    };
    let receipt = fetch_owned_receipt(&state, path.into_inner(), user_id).await?;
    let settings = utils::business_settings(&session);

    let bytes = persisted_receipt_pdf(&receipt, &settings)?;
    let disposition = format!("attachment; filename=receipt_{}.pdf", receipt.id);

    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .append_header(("Content-Disposition", disposition))
        .body(bytes))
}

#[get("/send-email/{receipt_id}")]
pub async fn send_email_handler(
    path: web::Path<i64>,
    state: Data<AppState>,
    session: Session,
    identity: Option<Identity>,
) -> Result<impl Responder, AppError> {
    let Some(user_id) = utils::identity_user_id(identity.as_ref()) else {
        return Ok(redirect("/login"));
    };
    let receipt = fetch_owned_receipt(&state, path.into_inner(), user_id).await?;

    let mut context = base_context(&state, &session);
    context.insert("title", "Email receipt");
    context.insert("client_name", &receipt.client_name);
    context.insert("receipt_id", &receipt.id);
    context.insert("date", &receipt.created_at);
    context.insert("total", &receipt.total);
    render("send_email.html", &context)
}

#[derive(Deserialize)]
pub struct EmailForm {
    client_email: String,
}

#[post("/send-email/{receipt_id}")]
pub async fn send_email_form_handler(
    path: web::Path<i64>,
    web::Form(form): web::Form<EmailForm>,
    state: Data<AppState>,
    session: Session,
    identity: Option<Identity>,
) -> Result<impl Responder, AppError> {
    let Some(user_id) = utils::identity_user_id(identity.as_ref()) else {
        return Ok(redirect("/login"));
    };
    let receipt = fetch_owned_receipt(&state, path.into_inner(), user_id).await?;
    let settings = utils::business_settings(&session);
    let location = format!("/receipt/{}", receipt.id);

    let Some(mailer) = state.mailer.as_ref() else {
        utils::flash(&session, "danger", "Email delivery is not configured.");
        return Ok(redirect(&location));
    };

    let bytes = persisted_receipt_pdf(&receipt, &settings)?;

    // Delivery failures are reported, never fatal to the request.
    match mailer
        .send_receipt(
            &form.client_email,
            &receipt.client_name,
            &settings.business_name,
            receipt.id,
            bytes,
        )
        .await
    {
        Ok(()) => utils::flash(&session, "success", "Email sent successfully!"),
        Err(e) => {
            log::warn!("Failed to email receipt {}: {}", receipt.id, e);
            utils::flash(&session, "danger", &format!("Failed to send email: {}", e));
        }
    }

    Ok(redirect(&location))
}

#[get("/recent_receipts")]
pub async fn recent_receipts_handler(
    state: Data<AppState>,
    session: Session,
    identity: Option<Identity>,
) -> Result<impl Responder, AppError> {
    let Some(user_id) = utils::identity_user_id(identity.as_ref()) else {
        return Ok(redirect("/login"));
    };
    let receipts = db::list_recent_receipts(&state.db_pool, user_id, RECENT_LIMIT).await?;

    let mut context = base_context(&state, &session);
    context.insert("title", "Recent receipts");
    context.insert("receipts", &receipts);
    render("recent_receipts.html", &context)
}

#[get("/history")]
pub async fn history_handler(
    state: Data<AppState>,
    session: Session,
    identity: Option<Identity>,
) -> Result<impl Responder, AppError> {
    let Some(user_id) = utils::identity_user_id(identity.as_ref()) else {
        return Ok(redirect("/login"));
    };
    let receipts = db::list_receipts(&state.db_pool, user_id).await?;

    let mut context = base_context(&state, &session);
    context.insert("title", "History");
    context.insert("receipts", &receipts);
    render("history.html", &context)
}

#[get("/settings")]
pub async fn settings_handler(
    state: Data<AppState>,
    session: Session,
    identity: Option<Identity>,
) -> Result<impl Responder, AppError> {
    if utils::identity_user_id(identity.as_ref()).is_none() {
        return Ok(redirect("/login"));
    }

    let mut context = base_context(&state, &session);
    context.insert("title", "Settings");
    context.insert("settings", &utils::business_settings(&session));
    render("settings.html", &context)
}

#[derive(Deserialize)]
pub struct SettingsForm {
    business_name: String,
    business_email: String,
}

#[post("/settings")]
pub async fn settings_form_handler(
    web::Form(form): web::Form<SettingsForm>,
    session: Session,
    identity: Option<Identity>,
) -> Result<impl Responder, AppError> {
    if utils::identity_user_id(identity.as_ref()).is_none() {
        return Ok(redirect("/login"));
    }

    let settings = BusinessSettings {
        business_name: if form.business_name.is_empty() {
            BusinessSettings::default().business_name
        } else {
            form.business_name
        },
        business_email: form.business_email,
    };
    utils::store_business_settings(&session, &settings);
    utils::flash(&session, "success", "Settings updated.");
    Ok(redirect("/settings"))
}

/// Owner-filtered lookup; a receipt owned by someone else is a plain 404.
async fn fetch_owned_receipt(
    state: &AppState,
    receipt_id: i64,
    user_id: i64,
) -> Result<Receipt, AppError> {
    db::get_receipt(&state.db_pool, receipt_id, user_id)
        .await?
        .ok_or(AppError::NotFound)
}

fn persisted_receipt_pdf(
    receipt: &Receipt,
    settings: &BusinessSettings,
) -> Result<Vec<u8>, AppError> {
    let normalized = items::normalize(&receipt.entries());
    let display_items = normalized.display_items();
    pdf::render_receipt_pdf(&ReceiptDocument {
        business_name: &settings.business_name,
        client_name: &receipt.client_name,
        date: &receipt.created_at,
        receipt_id: Some(receipt.id),
        items: &display_items,
        total: &normalized.display_total(),
    })
}

fn display_business_name(submitted: &str, session: &Session) -> String {
    if submitted.is_empty() {
        utils::business_settings(session).business_name
    } else {
        submitted.to_owned()
    }
}
