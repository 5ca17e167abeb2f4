use color_eyre::Result;
use earnit_api::ApiClient;
use serde_json::Value;
use tracing::info;

/// GET `path` and print the response body.
pub async fn get(api: &ApiClient, path: &str, no_auth: bool) -> Result<()> {
    let mut request = api.get(path);
    if no_auth {
        request = request.skip_auth();
    }
    let response = request.send().await?;
    info!(status = %response.status(), "response received");
    println!("{}", response.text().await?);
    Ok(())
}

/// POST a JSON `body` to `path` and print the reply.
pub async fn post(api: &ApiClient, path: &str, body: &str, no_auth: bool) -> Result<()> {
    let body: Value = serde_json::from_str(body)?;
    let mut request = api.post(path).json(&body);
    if no_auth {
        request = request.skip_auth();
    }
    let response = request.send().await?;
    info!(status = %response.status(), "response received");
    println!("{}", response.text().await?);
    Ok(())
}

/// Pick the API base URL: config file first, then the process-wide default.
pub fn base_url(configured: Option<&str>) -> String {
    match configured.map(str::trim).filter(|url| !url.is_empty()) {
        Some(url) => url.to_string(),
        None => earnit_api::default_base_url().url.clone(),
    }
}
