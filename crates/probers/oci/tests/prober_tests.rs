//! End-to-end tests of the OCI prober over an in-memory registry.

use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docprobe_core::{
    Error, ErrorKind, FetchOptions, Format, PackageIdentifier, PackageProbe, Probe, ProbeRegistry,
    Result,
};
use docprobe_oci::transport::{Image, ImageIndex, IndexEntry};
use docprobe_oci::{Envelope, OciOptions, OciProber, Platform, RegistryTransport, SignedEntity};
use oci_distribution::Reference;
use serde_json::json;

const INDEX_DIGEST: &str =
    "sha256:1111111111111111111111111111111111111111111111111111111111111111";
const AMD64_DIGEST: &str =
    "sha256:2222222222222222222222222222222222222222222222222222222222222222";
const ARM64_DIGEST: &str =
    "sha256:3333333333333333333333333333333333333333333333333333333333333333";
const WIN_DIGEST: &str =
    "sha256:4444444444444444444444444444444444444444444444444444444444444444";

const IMAGE: &str = "cgr.dev/chainguard/curl:latest";
const PURL: &str = "pkg:oci/curl?repository_url=cgr.dev/chainguard&tag=latest";

/// In-memory registry keyed by reference string, with attestations keyed by
/// manifest digest.
#[derive(Default)]
struct FakeRegistry {
    entities: HashMap<String, SignedEntity>,
    attestations: HashMap<String, Vec<Envelope>>,
    resolved: Mutex<Vec<String>>,
}

impl FakeRegistry {
    fn with_entity(mut self, reference: &str, entity: SignedEntity) -> Self {
        self.entities.insert(reference.to_string(), entity);
        self
    }

    fn with_attestations(mut self, digest: &str, envelopes: Vec<Envelope>) -> Self {
        self.attestations.insert(digest.to_string(), envelopes);
        self
    }

    fn resolved(&self) -> Vec<String> {
        self.resolved.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistryTransport for FakeRegistry {
    async fn resolve(&self, reference: &Reference) -> Result<SignedEntity> {
        let key = reference.to_string();
        self.resolved.lock().unwrap().push(key.clone());
        self.entities
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("manifest unknown: {key}")))
    }

    async fn fetch_attestations(&self, entity: &SignedEntity) -> Result<Vec<Envelope>> {
        Ok(self
            .attestations
            .get(entity.digest())
            .cloned()
            .unwrap_or_default())
    }
}

fn reference(s: &str) -> Reference {
    s.parse().unwrap()
}

fn image(reference_str: &str, digest: &str) -> SignedEntity {
    SignedEntity::Image(Image {
        reference: reference(reference_str),
        digest: digest.to_string(),
    })
}

fn entry(digest: &str, platform: Platform) -> IndexEntry {
    IndexEntry {
        digest: digest.to_string(),
        media_type: "application/vnd.oci.image.manifest.v1+json".to_string(),
        platform: Some(platform),
    }
}

fn multi_arch_index(extra: Vec<IndexEntry>) -> SignedEntity {
    let mut manifests = vec![
        entry(AMD64_DIGEST, Platform::new("linux", "amd64")),
        entry(ARM64_DIGEST, Platform::new("linux", "arm64").with_variant("v8")),
    ];
    manifests.extend(extra);
    SignedEntity::Index(ImageIndex {
        reference: reference(IMAGE),
        digest: INDEX_DIGEST.to_string(),
        manifests,
    })
}

fn by_digest(digest: &str) -> String {
    format!("cgr.dev/chainguard/curl@{digest}")
}

fn attestation(predicate_type: &str, predicate: serde_json::Value) -> Envelope {
    let statement = json!({
        "_type": "https://in-toto.io/Statement/v1",
        "subject": [{"name": "cgr.dev/chainguard/curl", "digest": {"sha256": "00"}}],
        "predicateType": predicate_type,
        "predicate": predicate,
    });
    Envelope::intoto(&serde_json::to_vec(&statement).unwrap())
}

fn spdx() -> Envelope {
    attestation("https://spdx.dev/Document", json!({"spdxVersion": "SPDX-2.3"}))
}

fn cyclonedx() -> Envelope {
    attestation("https://cyclonedx.org/bom", json!({"bomFormat": "CycloneDX"}))
}

fn provenance() -> Envelope {
    attestation("https://slsa.dev/provenance/v1", json!({"buildDefinition": {}}))
}

fn prober(registry: &Arc<FakeRegistry>, options: OciOptions) -> OciProber<Arc<FakeRegistry>> {
    OciProber::new(Arc::clone(registry), options)
}

fn purl(s: &str) -> PackageIdentifier {
    PackageIdentifier::parse(s).unwrap()
}

#[tokio::test]
async fn test_fetches_documents_of_single_arch_image() {
    let registry = Arc::new(
        FakeRegistry::default()
            .with_entity(IMAGE, image(IMAGE, AMD64_DIGEST))
            .with_attestations(AMD64_DIGEST, vec![spdx(), provenance()]),
    );

    let mut docs = prober(&registry, OciOptions::new())
        .fetch_documents(&FetchOptions::new(), &purl(PURL))
        .await
        .unwrap();

    let formats: Vec<&str> = docs.iter().map(|d| d.format().as_str()).collect();
    assert_eq!(
        formats,
        vec!["text/spdx+json", "application/vnd.slsa+json;version=1"]
    );

    let mut body = String::new();
    docs[0].read_to_string(&mut body).unwrap();
    assert_eq!(body, "{\n    \"spdxVersion\": \"SPDX-2.3\"\n}\n");
    assert_eq!(registry.resolved(), vec![IMAGE.to_string()]);
}

#[tokio::test]
async fn test_format_allow_list() {
    let registry = Arc::new(
        FakeRegistry::default()
            .with_entity(IMAGE, image(IMAGE, AMD64_DIGEST))
            .with_attestations(AMD64_DIGEST, vec![spdx(), cyclonedx(), provenance()]),
    );
    let options = FetchOptions::new().with_format(Format::new("application/vnd.cyclonedx+json"));

    let docs = prober(&registry, OciOptions::new())
        .fetch_documents(&options, &purl(PURL))
        .await
        .unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].format().as_str(), "application/vnd.cyclonedx+json");
}

#[tokio::test]
async fn test_image_without_attestations_is_empty() {
    let registry = Arc::new(FakeRegistry::default().with_entity(IMAGE, image(IMAGE, AMD64_DIGEST)));

    let docs = prober(&registry, OciOptions::new())
        .fetch_documents(&FetchOptions::new(), &purl(PURL))
        .await
        .unwrap();
    assert!(docs.is_empty());
}

#[tokio::test]
async fn test_without_platform_reads_index_attestations() {
    let registry = Arc::new(
        FakeRegistry::default()
            .with_entity(IMAGE, multi_arch_index(Vec::new()))
            .with_attestations(INDEX_DIGEST, vec![cyclonedx()])
            .with_attestations(ARM64_DIGEST, vec![spdx()]),
    );

    let docs = prober(&registry, OciOptions::new())
        .fetch_documents(&FetchOptions::new(), &purl(PURL))
        .await
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].format().as_str(), "application/vnd.cyclonedx+json");
}

#[tokio::test]
async fn test_platform_selects_single_image() {
    let registry = Arc::new(
        FakeRegistry::default()
            .with_entity(IMAGE, multi_arch_index(Vec::new()))
            .with_entity(&by_digest(ARM64_DIGEST), image(&by_digest(ARM64_DIGEST), ARM64_DIGEST))
            .with_attestations(INDEX_DIGEST, vec![cyclonedx()])
            .with_attestations(ARM64_DIGEST, vec![spdx()]),
    );

    let docs = prober(&registry, OciOptions::new().with_platform("linux/arm64"))
        .fetch_documents(&FetchOptions::new(), &purl(PURL))
        .await
        .unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].format().as_str(), "text/spdx+json");
    assert_eq!(
        registry.resolved(),
        vec![IMAGE.to_string(), by_digest(ARM64_DIGEST)]
    );
}

#[tokio::test]
async fn test_platform_without_match_is_not_found() {
    let registry = Arc::new(FakeRegistry::default().with_entity(IMAGE, multi_arch_index(Vec::new())));

    let err = prober(&registry, OciOptions::new().with_platform("darwin/amd64"))
        .fetch_documents(&FetchOptions::new(), &purl(PURL))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "selecting image platform");
}

#[tokio::test]
async fn test_platform_with_several_matches_is_ambiguous() {
    let registry = Arc::new(FakeRegistry::default().with_entity(IMAGE, multi_arch_index(Vec::new())));

    let err = prober(&registry, OciOptions::new().with_platform("linux"))
        .fetch_documents(&FetchOptions::new(), &purl(PURL))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AmbiguousPlatform);
}

#[tokio::test]
async fn test_platform_on_single_arch_image_is_rejected() {
    let registry = Arc::new(FakeRegistry::default().with_entity(IMAGE, image(IMAGE, AMD64_DIGEST)));

    let err = prober(&registry, OciOptions::new().with_platform("linux/amd64"))
        .fetch_documents(&FetchOptions::new(), &purl(PURL))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
}

#[tokio::test]
async fn test_windows_build_selects_revision() {
    let windows = entry(
        WIN_DIGEST,
        Platform::new("windows", "amd64").with_os_version("10.0.17763.1879"),
    );
    let registry = Arc::new(
        FakeRegistry::default()
            .with_entity(IMAGE, multi_arch_index(vec![windows]))
            .with_entity(&by_digest(WIN_DIGEST), image(&by_digest(WIN_DIGEST), WIN_DIGEST))
            .with_attestations(WIN_DIGEST, vec![provenance()]),
    );

    let docs = prober(
        &registry,
        OciOptions::new().with_platform("windows/amd64:10.0.17763"),
    )
    .fetch_documents(&FetchOptions::new(), &purl(PURL))
    .await
    .unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(registry.resolved().last(), Some(&by_digest(WIN_DIGEST)));
}

#[tokio::test]
async fn test_repository_override_changes_lookup() {
    let overridden = "mirror.example.com/chainguard/curl:latest";
    let registry = Arc::new(
        FakeRegistry::default()
            .with_entity(overridden, image(overridden, AMD64_DIGEST))
            .with_attestations(AMD64_DIGEST, vec![spdx()]),
    );

    let options = OciOptions::new().with_repository_override("mirror.example.com/chainguard");
    let docs = prober(&registry, options)
        .fetch_documents(&FetchOptions::new(), &purl(PURL))
        .await
        .unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(registry.resolved(), vec![overridden.to_string()]);
}

#[tokio::test]
async fn test_missing_image_is_wrapped() {
    let registry = Arc::new(FakeRegistry::default());

    let err = prober(&registry, OciOptions::new())
        .fetch_documents(&FetchOptions::new(), &purl(PURL))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "resolving image reference");
}

#[tokio::test]
async fn test_malformed_attestation_fails_fetch() {
    let registry = Arc::new(
        FakeRegistry::default()
            .with_entity(IMAGE, image(IMAGE, AMD64_DIGEST))
            .with_attestations(
                AMD64_DIGEST,
                vec![spdx(), Envelope::new("application/vnd.in-toto+json", "%%%")],
            ),
    );

    let err = prober(&registry, OciOptions::new())
        .fetch_documents(&FetchOptions::new(), &purl(PURL))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Decode);
    assert_eq!(err.to_string(), "downloading documents from registry");
}

#[tokio::test]
async fn test_bad_platform_option() {
    let registry = Arc::new(FakeRegistry::default());

    let err = prober(&registry, OciOptions::new().with_platform("a/b/c/d"))
        .fetch_documents(&FetchOptions::new(), &purl(PURL))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert_eq!(err.to_string(), "verifying options");
    assert!(registry.resolved().is_empty());
}

#[tokio::test]
async fn test_through_probe_registry() {
    let fake = Arc::new(
        FakeRegistry::default()
            .with_entity(IMAGE, image(IMAGE, AMD64_DIGEST))
            .with_attestations(AMD64_DIGEST, vec![spdx(), cyclonedx()]),
    );
    let registry = ProbeRegistry::new();
    registry.register(prober(&fake, OciOptions::new()));
    assert_eq!(registry.schemes(), vec!["oci".to_string()]);

    let probe = Probe::new(Arc::new(registry));
    let docs = probe.fetch(PURL).await.unwrap();
    assert_eq!(docs.len(), 2);

    let err = probe.fetch("pkg:npm/left-pad@1.3.0").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedScheme);
}
