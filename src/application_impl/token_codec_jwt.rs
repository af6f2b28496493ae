use crate::application_port::{AccessClaims, AccessToken, AuthError, CodecError, TokenCodec};
use crate::domain_model::{SessionId, UserId};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::fmt;

#[derive(Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub access_ttl: Duration,
    pub signing_key: Vec<u8>,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .finish_non_exhaustive()
    }
}

/// HS256-only access token codec. Tokens carrying any other `alg` are refused.
pub struct JwtHs256Codec {
    cfg: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp/nbf are judged by the engine against its own clock
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_issuer(&[cfg.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "iat", "iss"]);

        JwtHs256Codec {
            encoding_key: EncodingKey::from_secret(&cfg.signing_key),
            decoding_key: DecodingKey::from_secret(&cfg.signing_key),
            validation,
            cfg,
        }
    }

    fn classify(kind: &ErrorKind) -> CodecError {
        match kind {
            ErrorKind::InvalidSignature => CodecError::BadSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                CodecError::WrongAlgorithm
            }
            _ => CodecError::Malformed,
        }
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn issue_access_token(
        &self,
        user_id: UserId,
        email: &str,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> Result<(AccessToken, AccessClaims), AuthError> {
        let exp_dt = now + self.cfg.access_ttl;
        let claims = AccessClaims {
            user_id,
            email: email.to_string(),
            sid: session_id,
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: exp_dt.timestamp(),
            iss: self.cfg.issuer.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok((AccessToken(token), claims))
    }

    async fn parse_access_token(&self, token: &str) -> Result<AccessClaims, CodecError> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| Self::classify(e.kind()))?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(secret: &str) -> JwtConfig {
        JwtConfig {
            issuer: "sessiongate-test".to_string(),
            access_ttl: Duration::minutes(15),
            signing_key: secret.as_bytes().to_vec(),
        }
    }

    fn subject() -> (UserId, SessionId) {
        (UserId(uuid::Uuid::new_v4()), SessionId::new_random())
    }

    #[tokio::test]
    async fn issued_token_parses_back_to_the_same_claims() {
        let codec = JwtHs256Codec::new(cfg("k1"));
        let (user_id, session_id) = subject();
        let now = Utc::now();

        let (token, claims) = codec
            .issue_access_token(user_id, "bob@example.com", session_id, now)
            .await
            .unwrap();
        let parsed = codec.parse_access_token(&token.0).await.unwrap();

        assert_eq!(parsed, claims);
        assert_eq!(parsed.user_id, user_id);
        assert_eq!(parsed.sid, session_id);
        assert_eq!(parsed.email, "bob@example.com");
        assert_eq!(parsed.iat, now.timestamp());
        assert_eq!(parsed.nbf, now.timestamp());
        assert_eq!(parsed.exp, (now + Duration::minutes(15)).timestamp());
        assert_eq!(parsed.iss, "sessiongate-test");
    }

    #[tokio::test]
    async fn expired_claims_still_parse() {
        let codec = JwtHs256Codec::new(cfg("k1"));
        let (user_id, session_id) = subject();
        let long_ago = Utc::now() - Duration::days(2);
        let (token, _) = codec
            .issue_access_token(user_id, "bob@example.com", session_id, long_ago)
            .await
            .unwrap();

        assert!(codec.parse_access_token(&token.0).await.is_ok());
    }

    #[tokio::test]
    async fn token_from_another_secret_is_a_bad_signature() {
        let issuer = JwtHs256Codec::new(cfg("k1"));
        let verifier = JwtHs256Codec::new(cfg("k2"));
        let (user_id, session_id) = subject();
        let (token, _) = issuer
            .issue_access_token(user_id, "bob@example.com", session_id, Utc::now())
            .await
            .unwrap();

        assert_eq!(
            verifier.parse_access_token(&token.0).await.unwrap_err(),
            CodecError::BadSignature
        );
    }

    #[tokio::test]
    async fn other_algorithm_is_refused_even_with_the_right_secret() {
        let codec = JwtHs256Codec::new(cfg("k1"));
        let (user_id, session_id) = subject();
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            user_id,
            email: "bob@example.com".to_string(),
            sid: session_id,
            iat: now,
            nbf: now,
            exp: now + 600,
            iss: "sessiongate-test".to_string(),
        };
        let forged = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"k1"),
        )
        .unwrap();

        assert_eq!(
            codec.parse_access_token(&forged).await.unwrap_err(),
            CodecError::WrongAlgorithm
        );
    }

    #[tokio::test]
    async fn garbage_and_foreign_issuers_are_malformed() {
        let codec = JwtHs256Codec::new(cfg("k1"));
        assert_eq!(
            codec.parse_access_token("not.a.jwt").await.unwrap_err(),
            CodecError::Malformed
        );
        assert_eq!(
            codec.parse_access_token("").await.unwrap_err(),
            CodecError::Malformed
        );

        let foreign = JwtHs256Codec::new(JwtConfig {
            issuer: "someone-else".to_string(),
            ..cfg("k1")
        });
        let (user_id, session_id) = subject();
        let (token, _) = foreign
            .issue_access_token(user_id, "bob@example.com", session_id, Utc::now())
            .await
            .unwrap();
        assert_eq!(
            codec.parse_access_token(&token.0).await.unwrap_err(),
            CodecError::Malformed
        );
    }

    #[tokio::test]
    async fn tampered_payload_fails_signature() {
        let codec = JwtHs256Codec::new(cfg("k1"));
        let (user_id, session_id) = subject();
        let (token, _) = codec
            .issue_access_token(user_id, "bob@example.com", session_id, Utc::now())
            .await
            .unwrap();

        let mut parts: Vec<String> = token.0.split('.').map(str::to_string).collect();
        let other = JwtHs256Codec::new(cfg("k1"))
            .issue_access_token(user_id, "mallory@example.com", session_id, Utc::now())
            .await
            .unwrap()
            .0;
        parts[1] = other.0.split('.').nth(1).unwrap().to_string();
        // signature of the first token over the second payload
        let spliced = parts.join(".");

        assert_eq!(
            codec.parse_access_token(&spliced).await.unwrap_err(),
            CodecError::BadSignature
        );
    }
}
