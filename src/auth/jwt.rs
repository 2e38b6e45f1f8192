use crate::models::{Claims, TokenType};
use jsonwebtoken::{DecodingKey, Validation, decode};

/// Decodes and checks an access token. Refresh tokens are rejected.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())?;

    if claims.token_type != TokenType::Access {
        return Err("not an access token".to_string());
    }
    Ok(claims)
}

#[cfg(test)]
pub fn issue_token(
    user_id: u64,
    role: u8,
    employee_id: Option<u64>,
    token_type: TokenType,
    secret: &str,
) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;
    let claims = Claims {
        user_id,
        sub: format!("user{user_id}"),
        role,
        exp: now + 900,
        jti: uuid::Uuid::new_v4().to_string(),
        token_type,
        employee_id,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_access_rejects_refresh_and_bad_secret() {
        let token = issue_token(7, 2, Some(3), TokenType::Access, "secret");
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.employee_id, Some(3));

        assert!(verify_token(&token, "other").is_err());
        let refresh = issue_token(7, 2, Some(3), TokenType::Refresh, "secret");
        assert!(verify_token(&refresh, "secret").is_err());
    }
}
