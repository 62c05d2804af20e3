use devca::cert::params::{IssuanceRequest, Validity};
use devca::signer;
use devca::storage;

fn main() -> anyhow::Result<()> {
    // Self-signed root, ten years
    let ca = signer::issue_ca(&IssuanceRequest::ca(Validity::for_days(3650)?))?;
    println!("CA Certificate PEM:\n{}", ca.cert.to_pem()?);

    // Leaf for a name and a loopback address, signed by the root
    let request = IssuanceRequest::builder()
        .role(devca::cert::params::Role::Leaf {
            hosts: vec!["myserver.local".to_string(), "127.0.0.1".to_string()],
        })
        .common_name("My Server".to_string())
        .validity(Validity::for_days(365)?)
        .build();
    let server = signer::issue_leaf(&request, &ca)?;

    server.cert.verify_signed_by(&ca.cert.public_key()?)?;
    println!("Server Certificate PEM:\n{}", server.cert.to_pem()?);
    println!("Server Key PEM:\n{}", storage::encode_key_pem(&server.key)?);

    for name in server.cert.subject_alt_names()? {
        println!("SAN: {name:?}");
    }

    Ok(())
}
