//! End-to-end tests for the standard security handler
//!
//! Every test goes through the serialized form: the `/Encrypt` dictionary is
//! written as PDF bytes, tokenized again and only then used to recover keys.

use pdfseal::encryption::{
    file_id_array, Aes256Revision, DocumentIdGenerator, EncryptingWriter, EncryptionAlgorithm,
    EncryptionConfig, EncryptionDictionary, EncryptionError, Permissions, StandardDecryption,
    StandardSecurityHandler,
};
use pdfseal::objects::{Object, ObjectId};
use pdfseal::parser::{read_object, Lexer};
use std::io::Write;

const ALL_ALGORITHMS: [EncryptionAlgorithm; 4] = [
    EncryptionAlgorithm::Rc4Bits40,
    EncryptionAlgorithm::Rc4Bits128,
    EncryptionAlgorithm::Aes128,
    EncryptionAlgorithm::Aes256,
];

fn document_id() -> Vec<u8> {
    DocumentIdGenerator::new().next_id()
}

/// Serialize the handler's `/Encrypt` dictionary and parse it back
fn reparse(handler: &StandardSecurityHandler) -> EncryptionDictionary {
    let bytes = handler.encryption_dictionary().to_dict().to_bytes();
    let object = read_object(&mut Lexer::from_bytes(bytes)).unwrap();
    EncryptionDictionary::from_dict(object.as_dict().unwrap()).unwrap()
}

fn open(
    handler: &StandardSecurityHandler,
    password: &[u8],
) -> Result<StandardSecurityHandler, EncryptionError> {
    StandardSecurityHandler::read_key(&reparse(handler), handler.document_id(), password)
}

#[test]
fn test_user_and_owner_passwords_for_every_algorithm() {
    let id = document_id();
    for algorithm in ALL_ALGORITHMS {
        let config = EncryptionConfig::new(algorithm)
            .user_password("user pw")
            .owner_password("owner pw")
            .permissions(Permissions::PRINT | Permissions::FILL_FORMS);
        let handler = StandardSecurityHandler::setup(&config, &id).unwrap();

        let user = open(&handler, b"user pw").unwrap();
        assert!(!user.is_owner_password(), "{algorithm}");
        assert_eq!(user.key(), handler.key(), "{algorithm}");
        assert!(user.permissions().contains(Permissions::PRINT));
        assert!(!user.permissions().contains(Permissions::COPY));

        let owner = open(&handler, b"owner pw").unwrap();
        assert!(owner.is_owner_password(), "{algorithm}");
        assert_eq!(owner.key(), handler.key(), "{algorithm}");

        let err = open(&handler, b"guess").unwrap_err();
        assert!(err.is_recoverable());
    }
}

#[test]
fn test_revision_6_round_trip() {
    let id = document_id();
    let config = EncryptionConfig::new(EncryptionAlgorithm::Aes256)
        .user_password("Grüße".as_bytes())
        .owner_password("owner")
        .aes256_revision(Aes256Revision::R6);
    let handler = StandardSecurityHandler::setup(&config, &id).unwrap();
    assert_eq!(handler.revision(), 6);

    let dict = reparse(&handler);
    assert_eq!(dict.r, 6);
    assert_eq!(dict.v, 5);

    let reader = open(&handler, "Grüße".as_bytes()).unwrap();
    assert_eq!(reader.key(), handler.key());
    assert!(matches!(
        open(&handler, b"grusse"),
        Err(EncryptionError::BadPassword)
    ));
}

#[test]
fn test_metadata_flag_survives() {
    let id = document_id();
    for algorithm in [
        EncryptionAlgorithm::Rc4Bits128,
        EncryptionAlgorithm::Aes128,
        EncryptionAlgorithm::Aes256,
    ] {
        let config = EncryptionConfig::new(algorithm)
            .user_password("u")
            .encrypt_metadata(false);
        let handler = StandardSecurityHandler::setup(&config, &id).unwrap();

        let bytes = handler.encryption_dictionary().to_dict().to_bytes();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/EncryptMetadata false"), "{algorithm}: {text}");

        let reader = open(&handler, b"u").unwrap();
        assert!(!reader.encrypt_metadata(), "{algorithm}");
        assert_eq!(reader.key(), handler.key());
    }
}

#[test]
fn test_strings_and_streams_decrypt_after_reopen() {
    let id = document_id();
    let object = ObjectId::new(17, 0);
    let content = b"q 1 0 0 1 72 720 cm BT /F1 24 Tf (Secret) Tj ET Q".repeat(20);

    for algorithm in ALL_ALGORITHMS {
        let config = EncryptionConfig::new(algorithm).user_password("pw");
        let writer_side = StandardSecurityHandler::setup(&config, &id).unwrap();
        let encrypted_stream = writer_side.encrypt_stream(object, &content).unwrap();
        let encrypted_title = writer_side.encrypt_string(object, b"Quarterly report").unwrap();

        let reader_side = open(&writer_side, b"pw").unwrap();
        assert_eq!(
            reader_side.decrypt_stream(object, &encrypted_stream).unwrap(),
            content
        );
        assert_eq!(
            reader_side.decrypt_string(object, &encrypted_title).unwrap(),
            b"Quarterly report"
        );
    }
}

#[test]
fn test_streaming_and_one_shot_interoperate() {
    let id = document_id();
    let object = ObjectId::new(3, 0);
    let content: Vec<u8> = (0..4096u32).map(|i| (i % 256) as u8).collect();

    for algorithm in ALL_ALGORITHMS {
        let handler =
            StandardSecurityHandler::setup(&EncryptionConfig::new(algorithm), &id).unwrap();

        let mut writer = EncryptingWriter::new(&handler, object, Vec::new()).unwrap();
        for chunk in content.chunks(100) {
            writer.write_all(chunk).unwrap();
        }
        let encrypted = writer.finish().unwrap();
        assert_eq!(encrypted.len(), handler.calculate_stream_size(content.len()));
        assert_eq!(handler.decrypt_stream(object, &encrypted).unwrap(), content);

        let one_shot = handler.encrypt_stream(object, &content).unwrap();
        let mut decryption = StandardDecryption::new(&handler, object);
        let mut plain = Vec::new();
        for chunk in one_shot.chunks(333) {
            plain.extend(decryption.update(chunk).unwrap());
        }
        plain.extend(decryption.finish().unwrap());
        assert_eq!(plain, content, "{algorithm}");
    }
}

#[test]
fn test_wrong_document_id_fails() {
    let handler = StandardSecurityHandler::setup(
        &EncryptionConfig::new(EncryptionAlgorithm::Rc4Bits128).user_password("pw"),
        b"first id",
    )
    .unwrap();
    let dict = reparse(&handler);
    assert!(StandardSecurityHandler::read_key(&dict, b"first id", b"pw").is_ok());
    assert!(matches!(
        StandardSecurityHandler::read_key(&dict, b"other id", b"pw"),
        Err(EncryptionError::BadPassword)
    ));
}

#[test]
fn test_unsupported_handler_is_reported() {
    let source = b"<< /Filter /Standard /V 4 /R 4 /Length 128 \
        /CF << /StdCF << /CFM /Unknown >> >> /StmF /StdCF /StrF /StdCF \
        /O <00000000000000000000000000000000000000000000000000000000000000000000> \
        /U <00000000000000000000000000000000000000000000000000000000000000000000> \
        /P -4 >>";
    let object = read_object(&mut Lexer::from_bytes(source.as_slice())).unwrap();
    assert!(matches!(
        EncryptionDictionary::from_dict(object.as_dict().unwrap()),
        Err(EncryptionError::UnsupportedConfiguration(_))
    ));

    let public_key = b"<< /Filter /Adobe.PubSec /V 4 /R 4 >>";
    let object = read_object(&mut Lexer::from_bytes(public_key.as_slice())).unwrap();
    assert!(matches!(
        EncryptionDictionary::from_dict(object.as_dict().unwrap()),
        Err(EncryptionError::UnsupportedConfiguration(_))
    ));
}

#[test]
fn test_id_array_serialization() {
    let generator = DocumentIdGenerator::new();
    let id = generator.next_id();
    let array = file_id_array(Some(id.as_slice()), false, &generator);
    let bytes = array.to_bytes();
    assert_eq!(bytes.len(), 2 + 2 * 34 + 1);

    let parsed = read_object(&mut Lexer::from_bytes(bytes)).unwrap();
    assert_eq!(parsed, array);
    let Object::Array(items) = parsed else {
        panic!("expected array");
    };
    assert_eq!(items[0], Object::HexString(id));
}
