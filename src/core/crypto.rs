use crate::error::{Error, Result};
use kerberos_asn1::{Checksum, EncryptedData, EncryptionKey};
use kerberos_constants::{checksum_types, etypes};
use kerberos_crypto::{
    checksum_hmac_md5, new_kerberos_cipher, supported_etypes, KerberosCipher,
    Key,
};
use rand::RngCore;

/// Cryptographic operations required by the exchanges. The engine never
/// implements the algorithms, it just calls them through this trait.
pub trait Crypto {
    /// Encryption types supported, in order of preference
    fn supported_etypes(&self) -> Vec<i32>;

    fn is_supported(&self, etype: i32) -> bool {
        return self.supported_etypes().contains(&etype);
    }

    fn encrypt(
        &self,
        key: &EncryptionKey,
        key_usage: i32,
        plaintext: &[u8],
    ) -> Result<Vec<u8>>;

    fn decrypt(
        &self,
        key: &EncryptionKey,
        key_usage: i32,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>>;

    /// Keyed checksum with the mandatory checksum type of the key etype
    fn checksum(
        &self,
        key: &EncryptionKey,
        key_usage: i32,
        data: &[u8],
    ) -> Result<Checksum>;

    fn verify_checksum(
        &self,
        key: &EncryptionKey,
        key_usage: i32,
        data: &[u8],
        checksum: &Checksum,
    ) -> Result<bool> {
        let computed = self.checksum(key, key_usage, data)?;
        return Ok(computed.cksumtype == checksum.cksumtype
            && computed.checksum == checksum.checksum);
    }

    /// Derives a long-term key from a password
    fn string_to_key(
        &self,
        etype: i32,
        password: &str,
        salt: &[u8],
        s2kparams: Option<&[u8]>,
    ) -> Result<EncryptionKey>;

    fn random_key(&self, etype: i32) -> Result<EncryptionKey>;

    fn random_bytes(&self, len: usize) -> Vec<u8>;

    /// KRB-FX-CF2 of RFC 6113, used to combine keys in FAST
    fn cf2(
        &self,
        key1: &EncryptionKey,
        pepper1: &str,
        key2: &EncryptionKey,
        pepper2: &str,
    ) -> Result<EncryptionKey>;

    fn nonce(&self) -> u32 {
        let bytes = self.random_bytes(4);
        let mut raw = [0; 4];
        raw.copy_from_slice(&bytes[..4]);
        // The nonce is encoded as an ASN.1 INTEGER, keep it positive to
        // avoid interoperability problems with old KDCs.
        return u32::from_be_bytes(raw) & 0x7fff_ffff;
    }

    fn encrypt_data(
        &self,
        key: &EncryptionKey,
        key_usage: i32,
        plaintext: &[u8],
    ) -> Result<EncryptedData> {
        let cipher = self.encrypt(key, key_usage, plaintext)?;
        return Ok(EncryptedData::new(key.keytype, None, cipher));
    }

    fn decrypt_data(
        &self,
        key: &EncryptionKey,
        key_usage: i32,
        data: &EncryptedData,
    ) -> Result<Vec<u8>> {
        if data.etype != key.keytype {
            return Err(Error::CryptoError(format!(
                "Key etype {} does not match ciphertext etype {}",
                key.keytype, data.etype
            )));
        }
        return self.decrypt(key, key_usage, &data.cipher);
    }
}

/// Crypto collaborator backed by kerberos_crypto
#[derive(Debug, Default, Clone)]
pub struct KerberosCrypto {}

impl KerberosCrypto {
    pub fn new() -> Self {
        return Self {};
    }

    fn cipher(&self, etype: i32) -> Result<Box<dyn KerberosCipher>> {
        return new_kerberos_cipher(etype).map_err(|_| {
            Error::CryptoError(format!("Not supported etype: '{}'", etype))
        });
    }
}

impl Crypto for KerberosCrypto {
    fn supported_etypes(&self) -> Vec<i32> {
        return supported_etypes();
    }

    fn encrypt(
        &self,
        key: &EncryptionKey,
        key_usage: i32,
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        let cipher = self.cipher(key.keytype)?;
        return Ok(cipher.encrypt(&key.keyvalue, key_usage, plaintext));
    }

    fn decrypt(
        &self,
        key: &EncryptionKey,
        key_usage: i32,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        let cipher = self.cipher(key.keytype)?;
        return cipher
            .decrypt(&key.keyvalue, key_usage, ciphertext)
            .map_err(|err| {
                Error::CryptoError(format!("Decryption error: {}", err))
            });
    }

    fn checksum(
        &self,
        key: &EncryptionKey,
        key_usage: i32,
        data: &[u8],
    ) -> Result<Checksum> {
        if key.keytype != etypes::RC4_HMAC {
            return Err(Error::CryptoError(format!(
                "Keyed checksum not available for etype {}",
                key.keytype
            )));
        }

        return Ok(Checksum {
            cksumtype: checksum_types::HMAC_MD5,
            checksum: checksum_hmac_md5(&key.keyvalue, key_usage, data),
        });
    }

    fn string_to_key(
        &self,
        etype: i32,
        password: &str,
        salt: &[u8],
        _s2kparams: Option<&[u8]>,
    ) -> Result<EncryptionKey> {
        let cipher = self.cipher(etype)?;
        return Ok(EncryptionKey {
            keytype: etype,
            keyvalue: cipher.generate_key_from_string(password, salt),
        });
    }

    fn random_key(&self, etype: i32) -> Result<EncryptionKey> {
        let key = Key::random(etype).map_err(|_| {
            Error::CryptoError(format!("Not supported etype: '{}'", etype))
        })?;
        return Ok(EncryptionKey {
            keytype: etype,
            keyvalue: key.as_bytes().to_vec(),
        });
    }

    fn random_bytes(&self, len: usize) -> Vec<u8> {
        let mut bytes = vec![0; len];
        rand::thread_rng().fill_bytes(&mut bytes);
        return bytes;
    }

    fn cf2(
        &self,
        key1: &EncryptionKey,
        _pepper1: &str,
        _key2: &EncryptionKey,
        _pepper2: &str,
    ) -> Result<EncryptionKey> {
        return Err(Error::CryptoError(format!(
            "KRB-FX-CF2 not available for etype {}",
            key1.keytype
        )));
    }
}

/// Default salt of a principal: the realm followed by the name components
pub fn default_salt(realm: &str, name_string: &[String]) -> Vec<u8> {
    let mut salt = realm.as_bytes().to_vec();
    for component in name_string {
        salt.extend_from_slice(component.as_bytes());
    }
    return salt;
}

/// Key material supplied by the user to derive the reply key.
#[derive(Clone)]
pub enum Secret {
    Password(String),
    Key(EncryptionKey),
}

impl Secret {
    /// Converts the keys accepted by the command line into secrets.
    pub fn from_key(key: &Key) -> Self {
        match key {
            Key::Secret(password) => Secret::Password(password.clone()),
            _ => Secret::Key(EncryptionKey {
                keytype: key.etypes()[0],
                keyvalue: key.as_bytes().to_vec(),
            }),
        }
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Secret::Password(_) => write!(f, "Password(***)"),
            Secret::Key(key) => write!(f, "Key(etype {})", key.keytype),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_salt() {
        let salt =
            default_salt("EXAMPLE.COM", &["host".into(), "server".into()]);
        assert_eq!(b"EXAMPLE.COMhostserver".to_vec(), salt);
    }

    #[test]
    fn test_kerberos_crypto_roundtrip() {
        let crypto = KerberosCrypto::new();
        let key = crypto.random_key(etypes::AES256_CTS_HMAC_SHA1_96).unwrap();
        let encrypted = crypto.encrypt_data(&key, 3, b"reply").unwrap();
        assert_eq!(etypes::AES256_CTS_HMAC_SHA1_96, encrypted.etype);
        assert_eq!(
            b"reply".to_vec(),
            crypto.decrypt_data(&key, 3, &encrypted).unwrap()
        );
        assert!(crypto.decrypt_data(&key, 4, &encrypted).is_err());
    }

    #[test]
    fn test_kerberos_crypto_rc4_checksum() {
        let crypto = KerberosCrypto::new();
        let key = crypto.random_key(etypes::RC4_HMAC).unwrap();
        let cksum = crypto.checksum(&key, 6, b"body").unwrap();
        assert!(crypto.verify_checksum(&key, 6, b"body", &cksum).unwrap());
        assert!(!crypto.verify_checksum(&key, 6, b"other", &cksum).unwrap());
    }

    #[test]
    fn test_nonce_is_positive() {
        let crypto = KerberosCrypto::new();
        for _ in 0..32 {
            assert!(crypto.nonce() <= 0x7fff_ffff);
        }
    }
}
