use std::error::Error;

use packed_struct::PackedStruct;

use crate::{
    config::ProfileRegistry,
    drivers::touch_controller::{
        decoder::TouchReportDecoder,
        driver::{Driver, InterfaceClaim, SessionError},
        event::TouchKind,
        DecodeError,
    },
    sync::CancelToken,
    usb::{
        mock::{Call, MockTransport},
        TransportError,
    },
};

#[tokio::test]
async fn test_claim_detaches_and_reattaches() -> Result<(), Box<dyn Error>> {
    let mut transport = MockTransport::new("NanoTS");
    transport.kernel_driver_active = true;

    {
        let claim = InterfaceClaim::claim(&mut transport, 0)?;
        assert_eq!(claim.interface(), 0);
    }

    assert_eq!(
        transport.calls,
        vec![Call::Detach(0), Call::Claim(0), Call::Release(0), Call::Attach(0)]
    );

    Ok(())
}

#[tokio::test]
async fn test_claim_without_kernel_driver() -> Result<(), Box<dyn Error>> {
    let mut transport = MockTransport::new("NanoTS");

    drop(InterfaceClaim::claim(&mut transport, 1)?);

    assert_eq!(transport.calls, vec![Call::Claim(1), Call::Release(1)]);

    Ok(())
}

#[tokio::test]
async fn test_claim_failure_reattaches() -> Result<(), Box<dyn Error>> {
    let mut transport = MockTransport::new("NanoTS");
    transport.kernel_driver_active = true;
    transport.claim_result = Some(TransportError::Busy);

    let Err(e) = InterfaceClaim::claim(&mut transport, 0) else {
        panic!("claim should fail");
    };
    assert_eq!(e, TransportError::Busy);

    assert_eq!(
        transport.calls,
        vec![Call::Detach(0), Call::Claim(0), Call::Attach(0)]
    );

    Ok(())
}

#[tokio::test]
async fn test_release_failure_still_reattaches() -> Result<(), Box<dyn Error>> {
    let mut transport = MockTransport::new("NanoTS");
    transport.kernel_driver_active = true;
    transport.release_result = Some(TransportError::NoDevice);
    transport.attach_result = Some(TransportError::NoDevice);

    drop(InterfaceClaim::claim(&mut transport, 0)?);

    assert_eq!(
        transport.calls,
        vec![Call::Detach(0), Call::Claim(0), Call::Release(0), Call::Attach(0)]
    );

    Ok(())
}

#[tokio::test]
async fn test_get_touch_mode() -> Result<(), Box<dyn Error>> {
    let registry = ProfileRegistry::builtin();
    let mut transport = MockTransport::new("NanoTS");
    transport.push_control(Ok(vec![0xA3, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]));

    let mut driver = Driver::new(transport)?;
    let profile = driver.profile(&registry)?;
    let mode = driver.get_touch_mode(profile)?;
    assert_eq!(mode, 0x01);

    let transport = driver.into_transport();
    let requests = transport.control_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].setup_packet().pack()?,
        [0xA1, 0x01, 0xA3, 0x03, 0x00, 0x00, 0x08, 0x00]
    );
    assert_eq!(transport.calls.last(), Some(&Call::Release(0)));

    Ok(())
}

#[tokio::test]
async fn test_get_touch_mode_releases_on_error() -> Result<(), Box<dyn Error>> {
    let registry = ProfileRegistry::builtin();
    let mut transport = MockTransport::new("NanoTS");
    transport.kernel_driver_active = true;
    transport.push_control(Err(TransportError::Stall));

    let mut driver = Driver::new(transport)?;
    let profile = driver.profile(&registry)?;
    let result = driver.get_touch_mode(profile);
    assert!(matches!(
        result,
        Err(SessionError::Transport(TransportError::Stall))
    ));

    let transport = driver.into_transport();
    let tail = &transport.calls[transport.calls.len() - 2..];
    assert_eq!(tail, &[Call::Release(0), Call::Attach(0)]);

    Ok(())
}

#[tokio::test]
async fn test_get_touch_mode_truncated() -> Result<(), Box<dyn Error>> {
    let registry = ProfileRegistry::builtin();
    let mut transport = MockTransport::new("Gamesman");
    transport.push_control(Ok(vec![0xA0, 0x3A]));

    let mut driver = Driver::new(transport)?;
    let profile = driver.profile(&registry)?;
    let result = driver.get_touch_mode(profile);
    assert!(matches!(
        result,
        Err(SessionError::Decode(DecodeError::Truncated {
            needed: 4,
            actual: 2
        }))
    ));

    Ok(())
}

#[tokio::test]
async fn test_set_touch_mode() -> Result<(), Box<dyn Error>> {
    let registry = ProfileRegistry::builtin();
    let mut transport = MockTransport::new("Gamesman");
    transport.push_control(Ok(vec![]));

    let mut driver = Driver::new(transport)?;
    let profile = driver.profile(&registry)?;
    driver.set_touch_mode(profile, 0x01)?;
    driver.reset()?;

    let transport = driver.into_transport();
    let requests = transport.control_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].request_type_byte(), 0x21);
    assert_eq!(requests[0].value, 0x03A0);
    assert_eq!(
        requests[0].payload,
        vec![0xA0, 0x3A, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00]
    );
    assert_eq!(transport.calls.last(), Some(&Call::Reset));

    Ok(())
}

#[tokio::test]
async fn test_unsupported_manufacturer() -> Result<(), Box<dyn Error>> {
    let registry = ProfileRegistry::builtin();
    let driver = Driver::new(MockTransport::new("Kortek"))?;
    let result = driver.profile(&registry);
    assert!(matches!(
        result,
        Err(SessionError::UnsupportedManufacturer(_))
    ));
    assert!(driver.into_transport().calls.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_firmware_version() -> Result<(), Box<dyn Error>> {
    let mut transport = MockTransport::new("NanoTS");
    let mut response = vec![0u8; 64];
    response[8] = 1;
    response[10] = 7;
    transport.push_read(Ok(response));

    let mut driver = Driver::new(transport)?;
    let version = driver.firmware_version()?;
    assert_eq!(version.to_string(), "v1.7");

    let transport = driver.into_transport();
    let mut request = vec![0u8; 64];
    request[0] = 0x76;
    assert_eq!(
        transport.calls,
        vec![
            Call::Claim(1),
            Call::InterruptWrite(0x02, request),
            Call::InterruptRead(0x81),
            Call::Release(1),
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_firmware_version_truncated() -> Result<(), Box<dyn Error>> {
    let mut transport = MockTransport::new("NanoTS");
    transport.push_read(Ok(vec![0u8; 10]));

    let mut driver = Driver::new(transport)?;
    let result = driver.firmware_version();
    assert!(matches!(
        result,
        Err(SessionError::Decode(DecodeError::Truncated {
            needed: 11,
            actual: 10
        }))
    ));

    Ok(())
}

#[tokio::test]
async fn test_watch() -> Result<(), Box<dyn Error>> {
    let mut transport = MockTransport::new("NanoTS");
    transport.kernel_driver_active = true;
    let mut palm = vec![0u8; 64];
    palm[10..19].copy_from_slice(&[0x40, 0x64, 0x00, 0xC8, 0x00, 0x0A, 0x00, 0x05, 0x00]);
    transport.push_read(Err(TransportError::Timeout));
    transport.push_read(Ok(palm));
    transport.push_read(Err(TransportError::Timeout));
    transport.push_read(Ok(vec![0u8; 64]));

    let mut driver = Driver::new(transport)?;
    let decoder = TouchReportDecoder::default();
    let cancel = CancelToken::new();
    let mut seen = Vec::new();
    let count = driver.watch(&decoder, &cancel, Some(2), |_packet, events| {
        seen.push(events);
    })?;

    assert_eq!(count, 2);
    assert_eq!(seen.len(), 2);
    let first = seen[0].as_ref().expect("packet should decode");
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].kind, TouchKind::Palm);
    assert_eq!(seen[1], Ok(vec![]));

    let transport = driver.into_transport();
    assert_eq!(transport.calls.first(), Some(&Call::Detach(0)));
    let tail = &transport.calls[transport.calls.len() - 2..];
    assert_eq!(tail, &[Call::Release(0), Call::Attach(0)]);

    Ok(())
}

#[tokio::test]
async fn test_watch_cancelled() -> Result<(), Box<dyn Error>> {
    let mut transport = MockTransport::new("NanoTS");
    for _ in 0..4 {
        transport.push_read(Ok(vec![0u8; 64]));
    }

    let mut driver = Driver::new(transport)?;
    let decoder = TouchReportDecoder::default();
    let cancel = CancelToken::new();
    let handle = cancel.clone();
    let count = driver.watch(&decoder, &cancel, None, |_packet, _events| {
        handle.cancel();
    })?;
    assert_eq!(count, 1);

    let transport = driver.into_transport();
    assert_eq!(transport.read_results.len(), 3);
    assert_eq!(transport.calls.last(), Some(&Call::Release(0)));

    Ok(())
}

#[tokio::test]
async fn test_watch_device_gone() -> Result<(), Box<dyn Error>> {
    let mut transport = MockTransport::new("NanoTS");
    transport.push_read(Ok(vec![0u8; 64]));

    let mut driver = Driver::new(transport)?;
    let decoder = TouchReportDecoder::default();
    let cancel = CancelToken::new();
    let result = driver.watch(&decoder, &cancel, None, |_packet, _events| {});
    assert!(matches!(
        result,
        Err(SessionError::Transport(TransportError::NoDevice))
    ));

    let transport = driver.into_transport();
    assert_eq!(transport.calls.last(), Some(&Call::Release(0)));

    Ok(())
}
