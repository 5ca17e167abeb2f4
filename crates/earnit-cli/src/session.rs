use color_eyre::Result;
use earnit_api::realtime_url;
use earnit_core::{
    jwt::{decode_jwt_payload, JwtPayload},
    session::{Landing, Role, Session, SessionState},
};
use earnit_session::SessionManager;

pub async fn login(sessions: &SessionManager, token: &str, role: Option<Role>) -> Result<()> {
    sessions
        .store_session(token, role.as_ref())
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    match role {
        Some(role) => println!("Session stored ({role})."),
        None => println!("Session token stored."),
    }
    Ok(())
}

pub async fn set_role(sessions: &SessionManager, role: Role) -> Result<()> {
    sessions
        .store_role(&role)
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    println!("Role set to {role}.");
    Ok(())
}

pub async fn set_value(sessions: &SessionManager, key: &str, value: &str) -> Result<()> {
    sessions
        .store_value(key, value)
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    println!("Stored {key}.");
    Ok(())
}

pub async fn logout(sessions: &SessionManager) -> Result<()> {
    sessions.clear_session().await;
    println!("Signed out.");
    Ok(())
}

pub async fn whoami(sessions: &SessionManager, base_url: &str) -> Result<()> {
    let session = sessions.get_session().await;
    let claims = decode_jwt_payload(session.token.as_deref());
    for line in describe(&session, claims.as_ref(), base_url) {
        println!("{line}");
    }
    Ok(())
}

/// Human-readable session summary. The token itself is never printed.
fn describe(session: &Session, claims: Option<&JwtPayload>, base_url: &str) -> Vec<String> {
    let mut lines = Vec::new();
    match session.state() {
        SessionState::Anonymous => lines.push("Not signed in.".to_string()),
        SessionState::Authenticated { role: Some(role), .. } => {
            lines.push(format!("Signed in as {role}."))
        }
        SessionState::Authenticated { role: None, .. } => {
            lines.push("Signed in (no role stored).".to_string())
        }
    }
    lines.push(format!("Start screen: {}", landing_label(session.landing())));

    if session.is_authenticated() {
        match claims {
            Some(claims) => {
                let user = claims
                    .user_id()
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let role = claims
                    .role()
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let expires = claims
                    .expires_at()
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string());
                lines.push(format!(
                    "Token claims (unverified): user_id={user} role={role} expires={expires}"
                ));
            }
            None => lines.push("Token claims: could not decode".to_string()),
        }
        lines.push(format!("Realtime: {}", realtime_url(base_url, "***")));
    }
    lines
}

fn landing_label(landing: Landing) -> &'static str {
    match landing {
        Landing::Parent => "parent dashboard",
        Landing::Child => "child dashboard",
        Landing::Onboarding => "onboarding",
    }
}
