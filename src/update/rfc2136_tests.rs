// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `rfc2136.rs`

use super::*;

fn registration() -> UpdateTransaction {
    let mut txn = UpdateTransaction::new("127.0.0.1", 53, "example.com").unwrap();
    txn.delete_name("mongo1", "example.com").unwrap();
    txn.add_a("mongo1", "example.com", 60, "172.17.0.5").unwrap();
    txn.delete_name("grumpy_einstein", "example.com").unwrap();
    txn.add_cname("grumpy_einstein", "example.com", 600, "mongo1.example.com")
        .unwrap();
    txn.delete_rrset(RecordType::TXT, "a3d66b00acc9", "example.com")
        .unwrap();
    txn.add_txt(
        "a3d66b00acc9",
        "example.com",
        600,
        &["dockerDDNS-alias:grumpy_einstein:".to_string()],
    )
    .unwrap();
    txn
}

#[test]
fn test_message_header_and_zone_section() {
    let message = build_update_message(&registration()).unwrap();

    assert_eq!(message.op_code(), OpCode::Update);
    assert_eq!(message.queries().len(), 1);

    let zone = &message.queries()[0];
    assert_eq!(zone.name().to_string(), "example.com.");
    assert_eq!(zone.query_type(), hickory_client::rr::RecordType::SOA);
    assert_eq!(zone.query_class(), DNSClass::IN);
}

#[test]
fn test_update_section_preserves_order() {
    let message = build_update_message(&registration()).unwrap();
    let updates = message.name_servers();

    assert_eq!(updates.len(), 6);

    // name-wide delete
    assert_eq!(updates[0].name().to_string(), "mongo1.example.com.");
    assert_eq!(updates[0].dns_class(), DNSClass::ANY);
    assert_eq!(updates[0].record_type(), hickory_client::rr::RecordType::ANY);
    assert_eq!(updates[0].ttl(), 0);
    assert!(updates[0].data().is_none());

    // add A
    assert_eq!(updates[1].dns_class(), DNSClass::IN);
    assert_eq!(updates[1].ttl(), 60);
    match updates[1].data() {
        Some(RData::A(address)) => assert_eq!(address.to_string(), "172.17.0.5"),
        other => panic!("expected A rdata, got {other:?}"),
    }

    // add CNAME
    match updates[3].data() {
        Some(RData::CNAME(target)) => assert_eq!(target.0.to_string(), "mongo1.example.com."),
        other => panic!("expected CNAME rdata, got {other:?}"),
    }

    // typed TXT delete then TXT add
    assert_eq!(updates[4].record_type(), hickory_client::rr::RecordType::TXT);
    assert_eq!(updates[4].dns_class(), DNSClass::ANY);
    match updates[5].data() {
        Some(RData::TXT(txt)) => {
            let texts: Vec<String> = txt
                .txt_data()
                .iter()
                .map(|bytes| String::from_utf8_lossy(bytes).to_string())
                .collect();
            assert_eq!(texts, vec!["dockerDDNS-alias:grumpy_einstein:"]);
        }
        other => panic!("expected TXT rdata, got {other:?}"),
    }
}

#[tokio::test]
#[ignore = "Requires running BIND9 server with TSIG key configured for dynamic DNS updates"]
async fn test_submit_against_live_server() {
    use crate::tsig::TsigAlgorithm;

    let submitter = Rfc2136Submitter::new(TsigKeyData {
        name: "ddns-key".to_string(),
        algorithm: TsigAlgorithm::HmacSha256,
        secret: "dGVzdA==".to_string(),
    });

    submitter.submit(&registration()).await.unwrap();
}
