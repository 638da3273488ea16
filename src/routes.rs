use std::collections::HashMap;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cookie::{Cookie, SameSite};
use log::{error, warn};
use serde_json::Value;
use warp::http::{StatusCode, Uri};
use warp::reply::{self, Response};
use warp::{Filter, Rejection, Reply};

use crate::app::{App, Error, LoginReply, QueryMissed, QueryPractice, Result};
use crate::auth::{Credentials, SessionId};
use crate::user::CustomSet;
use crate::verb::{Attempt, FormError, Verb};

pub const SESSION_COOKIE: &str = "user_id";
const BODY_LIMIT: u64 = 64 * 1024;

pub fn routes(
    app: Arc<App>,
    secure: bool,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let public = app.public().to_path_buf();

    let with_app = warp::any().map(move || Arc::clone(&app));

    let session = warp::cookie::optional::<String>(SESSION_COOKIE)
        .map(|cookie: Option<String>| cookie.and_then(|c| c.parse::<SessionId>().ok()));

    let credentials = warp::body::content_length_limit(BODY_LIMIT).and(
        warp::body::json::<Credentials>()
            .or(warp::body::form::<Credentials>())
            .unify(),
    );

    let pages = {
        let index = warp::path::end().and(warp::fs::file(public.join("index.html")));
        let login = warp::path!("login").and(warp::fs::file(public.join("login.html")));
        let register = warp::path!("register").and(warp::fs::file(public.join("register.html")));

        warp::get().and(index.or(login).or(register))
    };

    let assets = warp::get().and(
        warp::path("js")
            .and(warp::fs::dir(public.join("js")))
            .or(warp::path("css").and(warp::fs::dir(public.join("css"))))
            .or(warp::path("res").and(warp::fs::dir(public.join("res")))),
    );

    let dashboard = warp::path!("dashboard")
        .and(warp::get())
        .and(with_app.clone())
        .and(session.clone())
        .map(|app: Arc<App>, session| match app.dashboard(session) {
            Ok(Some(html)) => reply::html(html).into_response(),
            Ok(None) => warp::redirect::see_other(Uri::from_static("/login")).into_response(),
            Err(e) => error_response(e),
        });

    let login = warp::path!("login")
        .and(warp::post())
        .and(with_app.clone())
        .and(credentials.clone())
        .map(move |app: Arc<App>, creds| login_response(app.login(creds), secure));

    let register = warp::path!("register")
        .and(warp::post())
        .and(with_app.clone())
        .and(credentials)
        .map(move |app: Arc<App>, creds| login_response(app.register(creds), secure));

    let logout = warp::path!("logout")
        .and(warp::post())
        .and(with_app.clone())
        .and(session.clone())
        .map(move |app: Arc<App>, session| match app.logout(session) {
            Ok(body) => {
                reply::with_header(reply::json(&body), "set-cookie", removal_cookie(secure))
                    .into_response()
            }
            Err(e) => error_response(e),
        });

    let verbs = {
        let page = warp::path!("verbs")
            .and(warp::get())
            .and(with_app.clone())
            .map(|app: Arc<App>| match app.verbs_page() {
                Ok(html) => reply::html(html).into_response(),
                Err(e) => error_response(e),
            });

        let verb_body = warp::body::content_length_limit(BODY_LIMIT).and(
            warp::body::json::<Verb>()
                .map(Ok::<_, FormError>)
                .or(warp::body::form::<HashMap<String, String>>()
                    .map(|form: HashMap<String, String>| Verb::from_form(&form)))
                .unify(),
        );

        let add = warp::path!("verbs")
            .and(warp::post())
            .and(with_app.clone())
            .and(session.clone())
            .and(verb_body)
            .map(|app: Arc<App>, session, verb| json_response(app.add_verb(session, verb)));

        let remove = warp::path!("verbs" / String)
            .and(warp::delete())
            .and(with_app.clone())
            .and(session.clone())
            .map(|infinitive: String, app: Arc<App>, session| {
                match urlencoding::decode(&infinitive) {
                    Ok(infinitive) => {
                        json_response(app.remove_verb(session, infinitive.into_owned()))
                    }
                    Err(e) => {
                        warn!("undecodable verb in path: {e}");
                        error_response(Error::BadRequest)
                    }
                }
            });

        page.or(add).or(remove)
    };

    let practice = {
        let random = warp::path!("practice")
            .and(warp::get())
            .and(with_app.clone())
            .and(session.clone())
            .and(warp::query::<QueryPractice>())
            .map(|app: Arc<App>, session, query| json_response(app.random_verb(session, query)));

        let attempt_body = warp::body::content_length_limit(BODY_LIMIT).and(
            warp::body::json::<Attempt>()
                .or(warp::body::form::<Attempt>())
                .unify(),
        );

        let check = warp::path!("practice")
            .and(warp::post())
            .and(with_app.clone())
            .and(session.clone())
            .and(attempt_body)
            .map(|app: Arc<App>, session, attempt| {
                json_response(app.check_attempt(session, attempt))
            });

        let missed = warp::path!("missed")
            .and(warp::get())
            .and(with_app.clone())
            .and(session.clone())
            .and(warp::query::<QueryMissed>())
            .map(|app: Arc<App>, session, query| json_response(app.missed(session, query)));

        random.or(check).or(missed)
    };

    let sets = {
        let get = warp::path!("sets")
            .and(warp::get())
            .and(with_app.clone())
            .and(session.clone())
            .map(|app: Arc<App>, session| json_response(app.sets(session)));

        let add = warp::path!("sets")
            .and(warp::post())
            .and(with_app)
            .and(session)
            .and(warp::body::content_length_limit(BODY_LIMIT))
            .and(warp::body::json::<CustomSet>())
            .map(|app: Arc<App>, session, set| json_response(app.add_set(session, set)));

        get.or(add)
    };

    let public = Arc::new(public);

    pages
        .or(assets)
        .or(dashboard)
        .or(login)
        .or(register)
        .or(logout)
        .or(verbs)
        .or(practice)
        .or(sets)
        .recover(move |rejection| recover(Arc::clone(&public), rejection))
        .with(warp::log("verbdrill"))
}

fn json_response(result: Result<Value>) -> Response {
    match result {
        Ok(body) => reply::json(&body).into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(e: Error) -> Response {
    reply::with_status(warp::reply(), StatusCode::from(e)).into_response()
}

fn login_response(result: Result<LoginReply>, secure: bool) -> Response {
    match result {
        Ok(LoginReply {
            body,
            session: Some(session),
        }) => reply::with_header(
            reply::json(&body),
            "set-cookie",
            session_cookie(&session, secure),
        )
        .into_response(),
        Ok(LoginReply { body, session: None }) => reply::json(&body).into_response(),
        Err(e) => error_response(e),
    }
}

fn session_cookie(session: &SessionId, secure: bool) -> String {
    Cookie::build((SESSION_COOKIE, session.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .build()
        .to_string()
}

fn removal_cookie(secure: bool) -> String {
    let mut cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .build();
    cookie.make_removal();
    cookie.to_string()
}

async fn recover(public: Arc<PathBuf>, rejection: Rejection) -> std::result::Result<Response, Infallible> {
    if rejection.is_not_found() {
        return Ok(not_found(&public).await);
    }

    if let Some(e) = rejection.find::<Error>() {
        return Ok(error_response(*e));
    }

    let status = if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        StatusCode::METHOD_NOT_ALLOWED
    } else if rejection.find::<warp::body::BodyDeserializeError>().is_some()
        || rejection.find::<warp::reject::UnsupportedMediaType>().is_some()
        || rejection.find::<warp::reject::InvalidQuery>().is_some()
        || rejection.find::<warp::reject::LengthRequired>().is_some()
    {
        StatusCode::BAD_REQUEST
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        StatusCode::PAYLOAD_TOO_LARGE
    } else {
        error!("unhandled rejection: {rejection:?}");
        StatusCode::INTERNAL_SERVER_ERROR
    };

    Ok(reply::with_status(warp::reply(), status).into_response())
}

async fn not_found(public: &Path) -> Response {
    let path = public.join("404.html");

    let body = match tokio::fs::read_to_string(&path).await {
        Ok(html) => html,
        Err(e) => {
            warn!("couldn't read {path:?}: {e}");
            "not found".into()
        }
    };

    reply::with_status(reply::html(body), StatusCode::NOT_FOUND).into_response()
}

#[cfg(test)]
mod test {
    use super::*;

    use std::fs;

    use serde_json::json;
    use tempfile::TempDir;

    use crate::db::{UserDb, VerbDb};

    fn setup() -> (TempDir, Arc<App>) {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().join("public");
        fs::create_dir_all(public.join("js")).unwrap();

        fs::write(public.join("index.html"), "<h1>index</h1>").unwrap();
        fs::write(public.join("404.html"), "<h1>lost</h1>").unwrap();
        fs::write(public.join("js").join("login.js"), "function validate() {}").unwrap();
        fs::write(
            public.join("dashboard.html"),
            "<p>{{username}}</p><img src='{{profile_pic}}'>{{olist missed}}",
        )
        .unwrap();
        fs::write(
            public.join("verbs.html"),
            "<p>{{verb_count}}</p>{{ulist verbs}}{{checklist verbs}}",
        )
        .unwrap();

        let users = UserDb::load(dir.path().join("data").join("users.json")).unwrap();
        let verbs = VerbDb::load(dir.path().join("data").join("verbs.json")).unwrap();

        let app = Arc::new(App::new(users, verbs, public));
        (dir, app)
    }

    fn body_json(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    fn aller() -> Value {
        json!({
            "infinitive": "aller",
            "tenses": [{
                "tense": "present",
                "je": "vais",
                "tu": "vas",
                "il": "va",
                "nous": "allons",
                "vous": "allez",
                "ils": "vont",
            }]
        })
    }

    async fn register(app: &Arc<App>, username: &str) -> String {
        let res = warp::test::request()
            .method("POST")
            .path("/register")
            .json(&json!({ "username": username, "password": "p@$$w0rd" }))
            .reply(&routes(Arc::clone(app), false))
            .await;

        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res.body());
        assert_eq!(body["invalid_input"], false);
        assert_eq!(body["server_error"], false);

        body["user_id"].as_str().unwrap().to_string()
    }

    fn cookie(id: &str) -> String {
        format!("{SESSION_COOKIE}={id}")
    }

    #[tokio::test]
    async fn register_sets_cookie() {
        let (_dir, app) = setup();
        let filter = routes(Arc::clone(&app), true);

        let res = warp::test::request()
            .method("POST")
            .path("/register")
            .json(&json!({ "username": "john_doe", "password": "p@$$w0rd" }))
            .reply(&filter)
            .await;

        let body = body_json(res.body());
        let id = body["user_id"].as_str().unwrap();
        assert_eq!(id.len(), 32);

        let set_cookie = res.headers()["set-cookie"].to_str().unwrap();
        assert!(set_cookie.starts_with(&format!("user_id={id}")));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("Secure"));
    }

    #[tokio::test]
    async fn register_rejects_taken_and_bad_names() {
        let (_dir, app) = setup();
        register(&app, "john_doe").await;

        for username in ["john_doe", "", "<script>"] {
            let res = warp::test::request()
                .method("POST")
                .path("/register")
                .json(&json!({ "username": username, "password": "x" }))
                .reply(&routes(Arc::clone(&app), false))
                .await;

            assert_eq!(
                body_json(res.body()),
                json!({ "invalid_input": true, "server_error": false })
            );
            assert!(res.headers().get("set-cookie").is_none());
        }
    }

    #[tokio::test]
    async fn login_checks_password() {
        let (_dir, app) = setup();
        let first = register(&app, "john_doe").await;
        let filter = routes(Arc::clone(&app), false);

        let res = warp::test::request()
            .method("POST")
            .path("/login")
            .json(&json!({ "username": "john_doe", "password": "n0tp@$$w0rd" }))
            .reply(&filter)
            .await;
        assert_eq!(
            body_json(res.body()),
            json!({ "invalid_input": true, "server_error": false })
        );

        let res = warp::test::request()
            .method("POST")
            .path("/login")
            .json(&json!({ "username": "not_in_server", "password": "p@$$w0rd" }))
            .reply(&filter)
            .await;
        assert_eq!(body_json(res.body())["invalid_input"], true);

        // already logged in from registering, so the session carries over
        let res = warp::test::request()
            .method("POST")
            .path("/login")
            .header("content-type", "application/x-www-form-urlencoded")
            .body("username=john_doe&password=p%40%24%24w0rd")
            .reply(&filter)
            .await;
        let body = body_json(res.body());
        assert_eq!(body["invalid_input"], false);
        assert_eq!(body["user_id"], first.as_str());
    }

    #[tokio::test]
    async fn verbs_need_a_session() {
        let (_dir, app) = setup();
        let filter = routes(Arc::clone(&app), false);

        let res = warp::test::request()
            .method("POST")
            .path("/verbs")
            .json(&aller())
            .reply(&filter)
            .await;
        assert_eq!(body_json(res.body())["invalid_input"], true);

        let res = warp::test::request()
            .method("POST")
            .path("/verbs")
            .header("cookie", cookie("garbage"))
            .json(&aller())
            .reply(&filter)
            .await;
        assert_eq!(body_json(res.body())["invalid_input"], true);
    }

    #[tokio::test]
    async fn practice_flow() {
        let (_dir, app) = setup();
        let id = register(&app, "john_doe").await;
        let filter = routes(Arc::clone(&app), false);

        let res = warp::test::request()
            .method("POST")
            .path("/verbs")
            .header("cookie", cookie(&id))
            .json(&aller())
            .reply(&filter)
            .await;
        assert_eq!(
            body_json(res.body()),
            json!({ "invalid_input": false, "server_error": false })
        );

        // duplicates are refused
        let res = warp::test::request()
            .method("POST")
            .path("/verbs")
            .header("cookie", cookie(&id))
            .json(&aller())
            .reply(&filter)
            .await;
        assert_eq!(body_json(res.body())["invalid_input"], true);

        let res = warp::test::request()
            .path("/practice")
            .header("cookie", cookie(&id))
            .reply(&filter)
            .await;
        let body = body_json(res.body());
        assert_eq!(body["verb"], "aller");
        assert_eq!(body["tense"], "present");

        let mut attempt = json!({
            "verb": "aller",
            "tense": "present",
            "je": "vais",
            "tu": "vas",
            "il": "va",
            "nous": "allons",
            "vous": "allez",
            "ils": "vont",
        });

        let res = warp::test::request()
            .method("POST")
            .path("/practice")
            .header("cookie", cookie(&id))
            .json(&attempt)
            .reply(&filter)
            .await;
        let body = body_json(res.body());
        assert_eq!(body["correct"], true);
        assert_eq!(body["expected"]["nous"], "allons");

        attempt["ils"] = "allent".into();
        let res = warp::test::request()
            .method("POST")
            .path("/practice")
            .header("cookie", cookie(&id))
            .json(&attempt)
            .reply(&filter)
            .await;
        assert_eq!(body_json(res.body())["correct"], false);

        let res = warp::test::request()
            .path("/missed?max=5")
            .header("cookie", cookie(&id))
            .reply(&filter)
            .await;
        assert_eq!(
            body_json(res.body())["missed"],
            json!([{ "infinitive": "aller", "tense": "present", "correct": 1, "incorrect": 1 }])
        );

        let res = warp::test::request()
            .path("/dashboard")
            .header("cookie", cookie(&id))
            .reply(&filter)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.body(),
            "<p>john_doe</p><img src='default.png'><ol id='missed'>\n<li>aller (present): 1/2 missed</li>\n</ol>\n"
        );
    }

    #[tokio::test]
    async fn practice_checks_verb_exists() {
        let (_dir, app) = setup();
        let id = register(&app, "john_doe").await;
        let filter = routes(Arc::clone(&app), false);

        let res = warp::test::request()
            .path("/practice")
            .header("cookie", cookie(&id))
            .reply(&filter)
            .await;
        // nothing to practise yet
        assert_eq!(
            body_json(res.body()),
            json!({ "invalid_input": false, "server_error": true })
        );

        let res = warp::test::request()
            .method("POST")
            .path("/practice")
            .header("cookie", cookie(&id))
            .json(&json!({
                "verb": "aller", "tense": "present",
                "je": "", "tu": "", "il": "", "nous": "", "vous": "", "ils": "",
            }))
            .reply(&filter)
            .await;
        assert_eq!(body_json(res.body())["invalid_input"], true);
    }

    #[tokio::test]
    async fn verb_form_and_removal() {
        let (_dir, app) = setup();
        let id = register(&app, "john_doe").await;
        let filter = routes(Arc::clone(&app), false);

        let form = [
            ("infinitive", "être"),
            ("tense-0", "present"),
            ("je-0", "suis"),
            ("tu-0", "es"),
            ("il-0", "est"),
            ("nous-0", "sommes"),
            ("vous-0", "êtes"),
            ("ils-0", "sont"),
        ]
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

        let res = warp::test::request()
            .method("POST")
            .path("/verbs")
            .header("cookie", cookie(&id))
            .header("content-type", "application/x-www-form-urlencoded")
            .body(form)
            .reply(&filter)
            .await;
        assert_eq!(body_json(res.body())["invalid_input"], false);

        let res = warp::test::request().path("/verbs").reply(&filter).await;
        assert_eq!(
            res.body(),
            "<p>1</p><ul id='verbs'>\n<li>être</li>\n</ul>\n\
<fieldset name='verbs'>\n<input type='checkbox' name='être' id='être' /><label for='être'>être</label>\n</fieldset>\n"
        );

        let res = warp::test::request()
            .method("DELETE")
            .path("/verbs/%C3%AAtre")
            .header("cookie", cookie(&id))
            .reply(&filter)
            .await;
        assert_eq!(
            body_json(res.body()),
            json!({ "invalid_input": false, "server_error": false })
        );

        let res = warp::test::request()
            .method("DELETE")
            .path("/verbs/%C3%AAtre")
            .header("cookie", cookie(&id))
            .reply(&filter)
            .await;
        assert_eq!(body_json(res.body())["invalid_input"], true);
    }

    fn conjugated(infinitive: &str, tenses: &[&str]) -> Value {
        let tenses = tenses
            .iter()
            .map(|tense| {
                json!({
                    "tense": tense,
                    "je": "a",
                    "tu": "b",
                    "il": "c",
                    "nous": "d",
                    "vous": "e",
                    "ils": "f",
                })
            })
            .collect::<Vec<_>>();

        json!({ "infinitive": infinitive, "tenses": tenses })
    }

    #[tokio::test]
    async fn markup_in_verbs_is_escaped() {
        let (_dir, app) = setup();
        let id = register(&app, "john_doe").await;
        let filter = routes(Arc::clone(&app), false);

        let infinitive = "<script>alert(1)</script>' onfocus='x";
        let res = warp::test::request()
            .method("POST")
            .path("/verbs")
            .header("cookie", cookie(&id))
            .json(&conjugated(infinitive, &["<b>present</b>"]))
            .reply(&filter)
            .await;
        assert_eq!(body_json(res.body())["invalid_input"], false);

        let res = warp::test::request().path("/verbs").reply(&filter).await;
        let page = std::str::from_utf8(res.body()).unwrap();
        assert!(!page.contains("<script>"));
        assert!(!page.contains("' onfocus"));
        assert!(page.contains("&lt;script&gt;"));

        let res = warp::test::request()
            .method("POST")
            .path("/practice")
            .header("cookie", cookie(&id))
            .json(&json!({
                "verb": infinitive,
                "tense": "<b>present</b>",
                "je": "z", "tu": "z", "il": "z", "nous": "z", "vous": "z", "ils": "z",
            }))
            .reply(&filter)
            .await;
        assert_eq!(body_json(res.body())["correct"], false);

        let res = warp::test::request()
            .path("/dashboard")
            .header("cookie", cookie(&id))
            .reply(&filter)
            .await;
        let page = std::str::from_utf8(res.body()).unwrap();
        assert!(!page.contains("<script>"));
        assert!(!page.contains("<b>"));
        assert!(page.contains("&lt;b&gt;present&lt;/b&gt;"));
    }

    #[tokio::test]
    async fn posted_verbs_are_trimmed_and_tenses_unique() {
        let (_dir, app) = setup();
        let id = register(&app, "john_doe").await;
        let filter = routes(Arc::clone(&app), false);

        let res = warp::test::request()
            .method("POST")
            .path("/verbs")
            .header("cookie", cookie(&id))
            .json(&conjugated("faire", &["present", "futur", "present"]))
            .reply(&filter)
            .await;
        assert_eq!(
            body_json(res.body()),
            json!({ "invalid_input": true, "server_error": false })
        );

        let res = warp::test::request()
            .method("POST")
            .path("/verbs")
            .header("cookie", cookie(&id))
            .json(&conjugated("  faire ", &[" present\t"]))
            .reply(&filter)
            .await;
        assert_eq!(body_json(res.body())["invalid_input"], false);

        let res = warp::test::request()
            .path("/practice")
            .header("cookie", cookie(&id))
            .reply(&filter)
            .await;
        let body = body_json(res.body());
        assert_eq!(body["verb"], "faire");
        assert_eq!(body["tense"], "present");

        // the trimmed infinitive is what's stored, so a padded copy is a duplicate
        let res = warp::test::request()
            .method("POST")
            .path("/verbs")
            .header("cookie", cookie(&id))
            .json(&conjugated("faire  ", &["present"]))
            .reply(&filter)
            .await;
        assert_eq!(body_json(res.body())["invalid_input"], true);
    }

    #[tokio::test]
    async fn custom_sets_restrict_practice() {
        let (_dir, app) = setup();
        let id = register(&app, "john_doe").await;
        let filter = routes(Arc::clone(&app), false);

        let res = warp::test::request()
            .method("POST")
            .path("/verbs")
            .header("cookie", cookie(&id))
            .json(&aller())
            .reply(&filter)
            .await;
        assert_eq!(body_json(res.body())["invalid_input"], false);

        let res = warp::test::request()
            .method("POST")
            .path("/sets")
            .header("cookie", cookie(&id))
            .json(&json!({ "name": "unknown", "verbs": ["venir"] }))
            .reply(&filter)
            .await;
        assert_eq!(body_json(res.body())["invalid_input"], true);

        let res = warp::test::request()
            .method("POST")
            .path("/sets")
            .header("cookie", cookie(&id))
            .json(&json!({ "name": "motion", "verbs": ["aller"] }))
            .reply(&filter)
            .await;
        assert_eq!(body_json(res.body())["invalid_input"], false);

        let res = warp::test::request()
            .path("/sets")
            .header("cookie", cookie(&id))
            .reply(&filter)
            .await;
        assert_eq!(
            body_json(res.body())["sets"],
            json!([{ "name": "motion", "verbs": ["aller"] }])
        );

        let res = warp::test::request()
            .path("/practice?set=motion")
            .header("cookie", cookie(&id))
            .reply(&filter)
            .await;
        assert_eq!(body_json(res.body())["verb"], "aller");

        let res = warp::test::request()
            .path("/practice?set=missing")
            .header("cookie", cookie(&id))
            .reply(&filter)
            .await;
        assert_eq!(body_json(res.body())["invalid_input"], true);
    }

    #[tokio::test]
    async fn logout_ends_session() {
        let (_dir, app) = setup();
        let id = register(&app, "john_doe").await;
        let filter = routes(Arc::clone(&app), false);

        let res = warp::test::request()
            .method("POST")
            .path("/logout")
            .header("cookie", cookie(&id))
            .reply(&filter)
            .await;
        assert_eq!(body_json(res.body())["invalid_input"], false);
        assert!(res.headers()["set-cookie"]
            .to_str()
            .unwrap()
            .starts_with("user_id=;"));

        let res = warp::test::request()
            .path("/missed")
            .header("cookie", cookie(&id))
            .reply(&filter)
            .await;
        assert_eq!(body_json(res.body())["invalid_input"], true);

        let res = warp::test::request()
            .path("/dashboard")
            .header("cookie", cookie(&id))
            .reply(&filter)
            .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()["location"], "/login");
    }

    #[tokio::test]
    async fn static_and_missing_pages() {
        let (_dir, app) = setup();
        let filter = routes(app, false);

        let res = warp::test::request().path("/").reply(&filter).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body(), "<h1>index</h1>");

        let res = warp::test::request().path("/js/login.js").reply(&filter).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = warp::test::request().path("/nowhere").reply(&filter).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.body(), "<h1>lost</h1>");
    }

    #[tokio::test]
    async fn dashboard_redirects_before_reading_template() {
        let (dir, app) = setup();
        fs::remove_file(dir.path().join("public").join("dashboard.html")).unwrap();
        let filter = routes(app, false);

        let res = warp::test::request().path("/dashboard").reply(&filter).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()["location"], "/login");
    }

    #[tokio::test]
    async fn dirty_stores_save() {
        let (dir, app) = setup();
        register(&app, "john_doe").await;

        app.save().unwrap();

        let users = UserDb::load(dir.path().join("data").join("users.json")).unwrap();
        assert!(users.matches("john_doe", "p@$$w0rd"));
        // nothing was added to the verb store
        assert!(!dir.path().join("data").join("verbs.json").exists());
    }
}
