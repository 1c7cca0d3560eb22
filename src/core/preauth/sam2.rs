//! SAM-2 single-use authentication of draft-ietf-krb-wg-kerberos-sam. The
//! KDC sends a challenge for a hardware token and the client returns the
//! single-use authentication data (SAD) encrypted in the response.

use super::{PreauthContext, PreauthMechanism, QUESTION_PASSWORD, QUESTION_SAM2};
use crate::core::constants::key_usages::{
    KEY_USAGE_PA_SAM_CHALLENGE_CKSUM, KEY_USAGE_PA_SAM_RESPONSE,
};
use crate::core::constants::sam_flags::{
    MUST_PK_ENCRYPT_SAD, SEND_ENCRYPTED_SAD, USE_SAD_AS_KEY,
};
use crate::error::{Error, Result};
use kerberos_asn1::{Checksum, EncryptedData, EncryptionKey, PaData};
use kerberos_constants::pa_data_types::{PA_SAM_CHALLENGE2, PA_SAM_RESPONSE2};
use log::debug;
use std::any::Any;

/// Body of the challenge, the part covered by the checksums.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SamChallenge2Body {
    pub sam_type: i32,
    pub sam_flags: u32,
    pub sam_type_name: Option<String>,
    pub sam_track_id: Option<String>,
    pub sam_challenge_label: Option<String>,
    pub sam_challenge: Option<String>,
    pub sam_response_prompt: Option<String>,
    pub sam_pk_for_sad: Option<EncryptionKey>,
    pub sam_nonce: u32,
    pub sam_etype: i32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PaSamChallenge2 {
    pub body: SamChallenge2Body,

    /// Body as received, needed to verify the checksums.
    pub encoded_body: Vec<u8>,
    pub sam_cksum: Vec<Checksum>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PaSamResponse2 {
    pub sam_type: i32,
    pub sam_flags: u32,
    pub sam_track_id: Option<String>,
    pub sam_enc_nonce_or_sad: EncryptedData,
    pub sam_nonce: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PaEncSamResponseEnc {
    pub sam_nonce: u32,
    pub sam_sad: Option<String>,
}

/// Key of the persisted configuration with the last SAM type used.
pub const CONF_SAM2_TYPE: &str = "sam2_type";

#[derive(Debug, Default)]
pub struct Sam2 {}

impl Sam2 {
    pub fn new() -> Self {
        return Self {};
    }
}

/// Text shown to the user when asking for the SAD
fn challenge_text(body: &SamChallenge2Body) -> Option<String> {
    let parts: Vec<&str> = vec![
        &body.sam_challenge_label,
        &body.sam_challenge,
        &body.sam_response_prompt,
    ]
    .into_iter()
    .filter_map(|p| p.as_ref().map(|s| s.as_str()))
    .filter(|s| !s.is_empty())
    .collect();

    if parts.is_empty() {
        return None;
    }
    return Some(parts.join(" "));
}

fn decode_challenge(
    ctx: &PreauthContext,
    padata: &PaData,
) -> Result<PaSamChallenge2> {
    let codec = ctx
        .env
        .codec
        .ok_or_else(|| Error::Config("SAM-2 requires an extension codec".into()))?;
    let challenge = codec.decode_sam_challenge2(&padata.padata_value)?;

    if challenge.body.sam_flags & MUST_PK_ENCRYPT_SAD != 0 {
        return Err(Error::String(
            "SAM-2 challenge requires a public key encrypted SAD".into(),
        ));
    }
    return Ok(challenge);
}

impl PreauthMechanism for Sam2 {
    fn name(&self) -> &'static str {
        return "sam2";
    }

    fn padata_types(&self) -> Vec<i32> {
        return vec![PA_SAM_CHALLENGE2];
    }

    fn prepare_questions(
        &self,
        ctx: &mut PreauthContext,
        _state: &mut dyn Any,
        padata: &PaData,
    ) -> Result<()> {
        let challenge = decode_challenge(ctx, padata)?;
        let body = &challenge.body;

        if body.sam_flags & USE_SAD_AS_KEY == 0 && ctx.need_as_key() {
            ctx.ask(QUESTION_PASSWORD, None);
        }
        ctx.ask(QUESTION_SAM2, challenge_text(body));
        return Ok(());
    }

    fn process(
        &self,
        ctx: &mut PreauthContext,
        _state: &mut dyn Any,
        padata: &PaData,
        out: &mut Vec<PaData>,
    ) -> Result<()> {
        let challenge = decode_challenge(ctx, padata)?;
        let body = &challenge.body;
        let crypto = ctx.env.crypto;

        if body.sam_etype != 0 {
            let salt = ctx.as_key.salt.clone();
            let s2kparams = ctx.as_key.s2kparams.clone();
            ctx.as_key.set_etype_info(body.sam_etype, salt, s2kparams);
        }

        let sad = ctx
            .answers
            .get(QUESTION_SAM2)
            .map(|s| s.to_string())
            .ok_or_else(|| {
                Error::String("No response for the SAM-2 challenge".into())
            })?;

        let (key, sam_sad) = if body.sam_flags & USE_SAD_AS_KEY != 0 {
            let key = crypto.string_to_key(
                ctx.as_key.etype,
                &sad,
                ctx.as_key.salt(),
                ctx.as_key.s2kparams.as_ref().map(|p| p.as_slice()),
            )?;
            ctx.set_as_key(key.clone());
            (key, None)
        } else {
            if body.sam_flags & SEND_ENCRYPTED_SAD == 0 {
                return Err(Error::String(
                    "SAM-2 challenge flags not supported".into(),
                ));
            }
            (ctx.get_as_key()?, Some(sad))
        };

        let mut verified = false;
        for cksum in challenge.sam_cksum.iter() {
            if crypto.verify_checksum(
                &key,
                KEY_USAGE_PA_SAM_CHALLENGE_CKSUM,
                &challenge.encoded_body,
                cksum,
            )? {
                verified = true;
                break;
            }
        }
        if !verified {
            return Err(Error::Modified(
                "SAM-2 challenge checksum does not match".into(),
            ));
        }

        let codec = ctx.env.codec.ok_or_else(|| {
            Error::Config("SAM-2 requires an extension codec".into())
        })?;
        let enc_response = PaEncSamResponseEnc {
            sam_nonce: body.sam_nonce,
            sam_sad,
        };
        let sam_enc_nonce_or_sad = crypto.encrypt_data(
            &key,
            KEY_USAGE_PA_SAM_RESPONSE,
            &codec.encode_enc_sam_response_enc(&enc_response)?,
        )?;

        let response = PaSamResponse2 {
            sam_type: body.sam_type,
            sam_flags: body.sam_flags,
            sam_track_id: body.sam_track_id.clone(),
            sam_enc_nonce_or_sad,
            sam_nonce: body.sam_nonce,
        };

        debug!("SAM-2 response for challenge type {}", body.sam_type);
        ctx.config_out
            .set(CONF_SAM2_TYPE, &body.sam_type.to_string());
        out.push(PaData::new(
            PA_SAM_RESPONSE2,
            codec.encode_sam_response2(&response)?,
        ));
        return Ok(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::crypto::{Crypto, Secret};
    use crate::core::testkit::PreauthFixture;

    const SAD: &str = "123456";

    fn challenge_padata(
        fixture: &PreauthFixture,
        sam_flags: u32,
        cksum_key: &EncryptionKey,
    ) -> PaData {
        let mut body = SamChallenge2Body::default();
        body.sam_type = 5;
        body.sam_flags = sam_flags;
        body.sam_track_id = Some("track-1".into());
        body.sam_challenge_label = Some("Token".into());
        body.sam_nonce = 77;

        let encoded_body = b"sam challenge body".to_vec();
        let cksum = fixture
            .crypto
            .checksum(cksum_key, KEY_USAGE_PA_SAM_CHALLENGE_CKSUM, &encoded_body)
            .unwrap();
        let challenge = PaSamChallenge2 {
            body,
            encoded_body,
            sam_cksum: vec![cksum],
        };
        return PaData::new(
            PA_SAM_CHALLENGE2,
            fixture.codec.encode_sam_challenge2(&challenge),
        );
    }

    fn process(
        fixture: &mut PreauthFixture,
        padata: &PaData,
    ) -> Result<Vec<PaData>> {
        let sam2 = Sam2::new();
        let mut state = sam2.request_init();
        let mut out = Vec::new();
        sam2.process(&mut fixture.ctx(), state.as_mut(), padata, &mut out)?;
        return Ok(out);
    }

    /// Decodes the response sent to the KDC, decrypting its encrypted
    /// part with `key`.
    fn sent_response(
        fixture: &PreauthFixture,
        out: &[PaData],
        key: &EncryptionKey,
    ) -> (PaSamResponse2, PaEncSamResponseEnc) {
        assert_eq!(1, out.len());
        assert_eq!(PA_SAM_RESPONSE2, out[0].padata_type);
        let response =
            fixture.codec.decode_sam_response2(&out[0].padata_value).unwrap();
        let raw = fixture
            .crypto
            .decrypt_data(
                key,
                KEY_USAGE_PA_SAM_RESPONSE,
                &response.sam_enc_nonce_or_sad,
            )
            .unwrap();
        let enc = fixture.codec.decode_enc_sam_response_enc(&raw).unwrap();
        return (response, enc);
    }

    #[test]
    fn test_send_encrypted_sad() {
        let mut fixture =
            PreauthFixture::new(Some(Secret::Password("secret".into())));
        let key = fixture.long_term_key("secret");
        let padata = challenge_padata(&fixture, SEND_ENCRYPTED_SAD, &key);

        Sam2::new()
            .prepare_questions(&mut fixture.ctx(), &mut (), &padata)
            .unwrap();
        assert!(fixture.questions.contains(QUESTION_SAM2));
        assert!(!fixture.questions.contains(QUESTION_PASSWORD));

        fixture.answers.set(QUESTION_SAM2, SAD);
        let out = process(&mut fixture, &padata).unwrap();

        let (response, enc) = sent_response(&fixture, &out, &key);
        assert_eq!(5, response.sam_type);
        assert_eq!(77, response.sam_nonce);
        assert_eq!(Some("track-1".to_string()), response.sam_track_id);
        assert_eq!(77, enc.sam_nonce);
        assert_eq!(Some(SAD.to_string()), enc.sam_sad);
        assert_eq!(Some("5"), fixture.config_out.get(CONF_SAM2_TYPE));
    }

    #[test]
    fn test_use_sad_as_key() {
        let mut fixture = PreauthFixture::new(None);
        let sad_key = fixture.long_term_key(SAD);
        let padata = challenge_padata(&fixture, USE_SAD_AS_KEY, &sad_key);

        // the password is not needed
        Sam2::new()
            .prepare_questions(&mut fixture.ctx(), &mut (), &padata)
            .unwrap();
        assert!(!fixture.questions.contains(QUESTION_PASSWORD));

        fixture.answers.set(QUESTION_SAM2, SAD);
        let out = process(&mut fixture, &padata).unwrap();

        let (_, enc) = sent_response(&fixture, &out, &sad_key);
        assert_eq!(None, enc.sam_sad);
        assert_eq!(Some(&sad_key), fixture.as_key.get());
    }

    #[test]
    fn test_bad_challenge_checksum() {
        let mut fixture =
            PreauthFixture::new(Some(Secret::Password("secret".into())));
        let other_key = fixture.long_term_key("other");
        let padata = challenge_padata(&fixture, SEND_ENCRYPTED_SAD, &other_key);
        fixture.answers.set(QUESTION_SAM2, SAD);

        let result = process(&mut fixture, &padata);
        assert!(matches!(result, Err(Error::Modified(_))));
    }

    #[test]
    fn test_public_key_sad_not_supported() {
        let mut fixture =
            PreauthFixture::new(Some(Secret::Password("secret".into())));
        let key = fixture.long_term_key("secret");
        let padata = challenge_padata(
            &fixture,
            SEND_ENCRYPTED_SAD | MUST_PK_ENCRYPT_SAD,
            &key,
        );
        fixture.answers.set(QUESTION_SAM2, SAD);

        assert!(process(&mut fixture, &padata).is_err());
    }

    #[test]
    fn test_challenge_text_skips_missing_parts() {
        let mut body = SamChallenge2Body::default();
        assert_eq!(None, challenge_text(&body));

        body.sam_challenge_label = Some("Token".into());
        body.sam_response_prompt = Some("Passcode:".into());
        assert_eq!(Some("Token Passcode:".to_string()), challenge_text(&body));
    }
}
