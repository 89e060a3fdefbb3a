//! Unit tests for the song burst service

use super::*;
use crate::att::{AttError, ATT_MAX_MTU, CLIENT_CHAR_CONFIG_UUID};
use crate::gatt::{AttributeValue, ClientCharConfig, GattServer, GattServerConfig, NotificationSink};
use crate::uuid::Uuid;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

/// Records notifications; refuses those for `refuse`
#[derive(Default)]
struct RecordingSink {
    refuse: Option<ConnHandle>,
    sent: Mutex<Vec<(ConnHandle, u16, Vec<u8>)>>,
}

impl NotificationSink for RecordingSink {
    fn send_notification(&self, conn: ConnHandle, handle: u16, value: &[u8]) -> AttResult<()> {
        if self.refuse == Some(conn) {
            return Err(AttError::InsufficientResources);
        }
        self.sent.lock().unwrap().push((conn, handle, value.to_vec()));
        Ok(())
    }
}

/// A runtime that never accepts a table
struct RefusingRuntime {
    slots: usize,
}

impl GattRuntime for RefusingRuntime {
    fn max_connections(&self) -> usize {
        self.slots
    }

    fn register_service(
        &self,
        _table: AttributeTable,
        _access: Arc<dyn AttributeAccess>,
    ) -> AttResult<Arc<AttributeTable>> {
        Err(AttError::InsufficientResources)
    }

    fn send_notification(&self, _conn: ConnHandle, _handle: u16, _value: &[u8]) -> AttResult<()> {
        Ok(())
    }
}

/// Keeps the table it is given but hands back a bare one
#[derive(Default)]
struct SwappingRuntime {
    kept: Mutex<Option<AttributeTable>>,
}

impl GattRuntime for SwappingRuntime {
    fn max_connections(&self) -> usize {
        1
    }

    fn register_service(
        &self,
        mut table: AttributeTable,
        _access: Arc<dyn AttributeAccess>,
    ) -> AttResult<Arc<AttributeTable>> {
        table.assign_handles(1)?;
        *self.kept.lock().unwrap() = Some(table);

        let mut bare = AttributeTable::primary_service(Uuid::from_ti_u16(SONG_SERVICE_ID), 16);
        bare.assign_handles(1)?;
        Ok(Arc::new(bare))
    }

    fn send_notification(&self, _conn: ConnHandle, _handle: u16, _value: &[u8]) -> AttResult<()> {
        Ok(())
    }
}

/// Counts parameter-change up-calls
#[derive(Default)]
struct CountingCallbacks {
    config_changes: AtomicUsize,
    data_changes: AtomicUsize,
}

impl ProfileCallbacks for CountingCallbacks {
    fn on_parameter_changed(&self, param: Parameter) {
        match param {
            Parameter::Config => self.config_changes.fetch_add(1, Ordering::SeqCst),
            Parameter::Data => self.data_changes.fetch_add(1, Ordering::SeqCst),
        };
    }
}

fn registered() -> (SongBurstService, Arc<GattServer>, Arc<RecordingSink>) {
    registered_with_sink(RecordingSink::default())
}

fn registered_with_sink(sink: RecordingSink) -> (SongBurstService, Arc<GattServer>, Arc<RecordingSink>) {
    let sink = Arc::new(sink);
    let server = Arc::new(GattServer::new(GattServerConfig::default(), sink.clone()));
    let service = SongBurstService::new(SongServiceConfig::default());
    service.add_service(&server).unwrap();
    (service, server, sink)
}

fn attribute(service: &SongBurstService, param: Parameter) -> Attribute {
    let handle = service.value_handle(param).unwrap();
    service.attribute_table().unwrap().get(handle).unwrap().clone()
}

fn cccd_attribute(service: &SongBurstService) -> Attribute {
    let handle = service.cccd_handle().unwrap();
    service.attribute_table().unwrap().get(handle).unwrap().clone()
}

fn pattern() -> Vec<u8> {
    (0..SONG_DATA_LEN).map(|i| (i * 7 % 251) as u8).collect()
}

fn read(service: &SongBurstService, attr: &Attribute, offset: u16, max_len: u16) -> AttResult<Vec<u8>> {
    let mut out = vec![0u8; 512];
    let len = service.read_attribute(
        ConnHandle(1),
        attr,
        &mut out,
        offset,
        max_len,
        AccessMethod::ReadBlob,
    )?;
    out.truncate(len);
    Ok(out)
}

fn write(service: &SongBurstService, attr: &Attribute, value: &[u8], offset: u16) -> AttResult<()> {
    service.write_attribute(ConnHandle(1), attr, value, offset, AccessMethod::Write)
}

#[test]
fn test_table_layout() {
    let (service, _server, _sink) = registered();
    let table = service.attribute_table().unwrap();

    assert_eq!(table.len(), 6);
    assert_eq!(service.value_handle(Parameter::Data), Some(3));
    assert_eq!(service.cccd_handle(), Some(4));
    assert_eq!(service.value_handle(Parameter::Config), Some(6));
    assert_eq!(table.get(3).unwrap().type_, Uuid::from_ti_u16(SONG_DATA_ID));
    assert!(!table.get(3).unwrap().permissions.can_write());
    assert!(table.get(6).unwrap().permissions.can_write());
    assert_eq!(table.encryption_key_size(), 16);
}

#[test]
fn test_table_with_user_descriptions() {
    let server = Arc::new(GattServer::new(
        GattServerConfig::default(),
        Arc::new(RecordingSink::default()),
    ));
    let service = SongBurstService::new(SongServiceConfig {
        user_descriptions: true,
        ..Default::default()
    });
    service.add_service(&server).unwrap();

    let table = service.attribute_table().unwrap();
    assert_eq!(table.len(), 8);
    assert!(matches!(
        &table.get(5).unwrap().value,
        AttributeValue::Static(bytes) if bytes.as_slice() == DATA_USER_DESCRIPTION.as_bytes()
    ));
    assert!(matches!(
        &table.get(8).unwrap().value,
        AttributeValue::Static(bytes) if bytes.as_slice() == CONFIG_USER_DESCRIPTION.as_bytes()
    ));
}

#[test]
fn test_data_reads_zero_after_registration() {
    let service = SongBurstService::new(SongServiceConfig::default());
    service.set_parameter(Parameter::Data, &[0x55; SONG_DATA_LEN]).unwrap();

    let server = Arc::new(GattServer::new(
        GattServerConfig::default(),
        Arc::new(RecordingSink::default()),
    ));
    service.add_service(&server).unwrap();

    let data = attribute(&service, Parameter::Data);
    assert_eq!(read(&service, &data, 0, 378).unwrap(), vec![0u8; SONG_DATA_LEN]);
}

#[test]
fn test_data_partial_reads() {
    let (service, _server, _sink) = registered();
    let value = pattern();
    service.set_parameter(Parameter::Data, &value).unwrap();
    let data = attribute(&service, Parameter::Data);

    for offset in 0..=SONG_DATA_LEN {
        for max_len in [1usize, 22, 100, 377, 378, 512] {
            let expected = max_len.min(SONG_DATA_LEN - offset);
            let got = read(&service, &data, offset as u16, max_len as u16).unwrap();
            assert_eq!(got.len(), expected, "offset {} max_len {}", offset, max_len);
            assert_eq!(got, value[offset..offset + expected]);
        }
    }
}

#[test]
fn test_data_read_offset_bounds() {
    let (service, _server, _sink) = registered();
    let data = attribute(&service, Parameter::Data);

    assert_eq!(read(&service, &data, 378, 22).unwrap(), Vec::<u8>::new());
    assert_eq!(read(&service, &data, 379, 22), Err(AttError::InvalidOffset(379)));
    assert_eq!(read(&service, &data, u16::MAX, 22), Err(AttError::InvalidOffset(u16::MAX)));
}

#[test]
fn test_data_read_bounded_by_output_buffer() {
    let (service, _server, _sink) = registered();
    service.set_parameter(Parameter::Data, &pattern()).unwrap();
    let data = attribute(&service, Parameter::Data);

    let mut out = [0u8; 10];
    let len = service
        .read_attribute(ConnHandle(1), &data, &mut out, 5, 378, AccessMethod::ReadBlob)
        .unwrap();
    assert_eq!(len, 10);
    assert_eq!(out.as_slice(), &pattern()[5..15]);
}

#[test]
fn test_config_read_ignores_offset() {
    let (service, _server, _sink) = registered();
    service.set_parameter(Parameter::Config, &[0x01, 0x02]).unwrap();
    let config = attribute(&service, Parameter::Config);

    assert_eq!(read(&service, &config, 0, 22).unwrap(), vec![0x01, 0x02]);
    assert_eq!(read(&service, &config, 1, 22).unwrap(), vec![0x01, 0x02]);
}

#[test]
fn test_set_data_wrong_length_leaves_buffer() {
    let (service, _server, _sink) = registered();
    let value = pattern();
    service.set_parameter(Parameter::Data, &value).unwrap();

    for len in [0usize, 2, 377, 379] {
        assert_eq!(
            service.set_parameter(Parameter::Data, &vec![0xFF; len]),
            Err(ProfileError::InvalidRange {
                expected: SONG_DATA_LEN,
                actual: len
            })
        );
    }

    let data = attribute(&service, Parameter::Data);
    assert_eq!(read(&service, &data, 0, 378).unwrap(), value);
}

#[test]
fn test_set_config_wrong_length() {
    let (service, _server, _sink) = registered();
    service.set_parameter(Parameter::Config, &[7, 8]).unwrap();

    let err = service.set_parameter(Parameter::Config, &[1, 2, 3]).unwrap_err();
    assert_eq!(err, ProfileError::InvalidRange { expected: 2, actual: 3 });
    assert_eq!(err.status(), crate::error::STATUS_INVALID_RANGE);
    assert_eq!(service.config_value(), [7, 8]);
}

#[test]
fn test_config_write_notifies_application() {
    let (service, _server, _sink) = registered();
    let callbacks = Arc::new(CountingCallbacks::default());
    service.register_callbacks(Some(callbacks.clone())).unwrap();
    let config = attribute(&service, Parameter::Config);

    write(&service, &config, &[0x34, 0x12], 0).unwrap();
    assert_eq!(service.config_value(), [0x34, 0x12]);
    assert_eq!(callbacks.config_changes.load(Ordering::SeqCst), 1);
    assert_eq!(callbacks.data_changes.load(Ordering::SeqCst), 0);

    // Application-side updates do not call back
    service.set_parameter(Parameter::Config, &[0, 0]).unwrap();
    assert_eq!(callbacks.config_changes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_config_write_validation() {
    let (service, _server, _sink) = registered();
    let callbacks = Arc::new(CountingCallbacks::default());
    service.register_callbacks(Some(callbacks.clone())).unwrap();
    service.set_parameter(Parameter::Config, &[9, 9]).unwrap();
    let config = attribute(&service, Parameter::Config);

    let err = write(&service, &config, &[1, 2, 3], 0).unwrap_err();
    assert_eq!(err, AttError::InvalidAttributeValueLength(3));
    assert_eq!(u8::from(err.to_error_code()), 0x0D);

    let err = write(&service, &config, &[1, 2], 1).unwrap_err();
    assert_eq!(err, AttError::AttributeNotLong);
    assert_eq!(u8::from(err.to_error_code()), 0x0B);

    assert_eq!(write(&service, &config, &[1], 0), Err(AttError::InvalidAttributeValueLength(1)));
    assert_eq!(service.config_value(), [9, 9]);
    assert_eq!(callbacks.config_changes.load(Ordering::SeqCst), 0);
}

#[test]
fn test_data_write_rejected() {
    let (service, _server, _sink) = registered();
    let data = attribute(&service, Parameter::Data);

    assert_eq!(
        write(&service, &data, &[0; SONG_DATA_LEN], 0),
        Err(AttError::WriteNotPermitted)
    );
    assert_eq!(service.data(), [0; SONG_DATA_LEN]);
}

#[test]
fn test_unknown_attributes() {
    let (service, _server, _sink) = registered();
    let mut attr = attribute(&service, Parameter::Config);

    attr.type_ = Uuid::from_ti_u16(0xAA99);
    assert_eq!(read(&service, &attr, 0, 22), Err(AttError::AttributeNotFound));
    assert_eq!(write(&service, &attr, &[0, 0], 0), Err(AttError::AttributeNotFound));

    attr.type_ = "12345678-1234-5678-1234-56789abcdef0".parse().unwrap();
    assert_eq!(read(&service, &attr, 0, 22), Err(AttError::InvalidHandle(6)));
    assert_eq!(write(&service, &attr, &[0, 0], 0), Err(AttError::InvalidHandle(6)));

    // CCCD reads are answered by the runtime, never by the service
    let cccd = cccd_attribute(&service);
    assert_eq!(cccd.type_, CLIENT_CHAR_CONFIG_UUID);
    assert_eq!(read(&service, &cccd, 0, 22), Err(AttError::AttributeNotFound));
}

#[test]
fn test_cccd_write_allows_notify_only() {
    let (service, _server, _sink) = registered();
    let cccd = cccd_attribute(&service);
    let subscriptions = cccd.subscriptions().unwrap().clone();

    assert_eq!(
        write(&service, &cccd, &[2, 0], 0),
        Err(AttError::CccdImproperlyConfigured(2))
    );
    assert_eq!(write(&service, &cccd, &[1, 0], 1), Err(AttError::AttributeNotLong));
    assert!(subscriptions.subscribers(ClientCharConfig::NOTIFY).is_empty());

    write(&service, &cccd, &[1, 0], 0).unwrap();
    assert_eq!(
        subscriptions.subscribers(ClientCharConfig::NOTIFY),
        vec![ConnHandle(1)]
    );
}

#[test]
fn test_register_callbacks_once() {
    let service = SongBurstService::new(SongServiceConfig::default());
    let first = Arc::new(CountingCallbacks::default());
    let second = Arc::new(CountingCallbacks::default());

    service.register_callbacks(Some(first.clone())).unwrap();
    assert_eq!(
        service.register_callbacks(Some(second.clone())),
        Err(ProfileError::AlreadyRegistered)
    );
    assert_eq!(
        service.register_callbacks(None),
        Err(ProfileError::AlreadyRegistered)
    );

    let server = Arc::new(GattServer::new(
        GattServerConfig::default(),
        Arc::new(RecordingSink::default()),
    ));
    service.add_service(&server).unwrap();
    write(&service, &attribute(&service, Parameter::Config), &[1, 1], 0).unwrap();

    assert_eq!(first.config_changes.load(Ordering::SeqCst), 1);
    assert_eq!(second.config_changes.load(Ordering::SeqCst), 0);
}

#[test]
fn test_register_none_keeps_slot_open() {
    let service = SongBurstService::new(SongServiceConfig::default());
    service.register_callbacks(None).unwrap();
    assert!(!service.has_callbacks());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    service
        .register_callbacks(Some(Arc::new(move |param: Parameter| {
            recorder.lock().unwrap().push(param)
        })))
        .unwrap();
    assert!(service.has_callbacks());

    let server = Arc::new(GattServer::new(
        GattServerConfig::default(),
        Arc::new(RecordingSink::default()),
    ));
    service.add_service(&server).unwrap();
    write(&service, &attribute(&service, Parameter::Config), &[2, 2], 0).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![Parameter::Config]);
}

#[test]
fn test_add_service_once() {
    let (service, server, _sink) = registered();
    assert!(service.is_registered());

    assert_eq!(service.add_service(&server), Err(ProfileError::AlreadyRegistered));
    assert_eq!(server.services().len(), 1);
}

#[test]
fn test_runtime_refusal_leaves_service_unregistered() {
    let service = SongBurstService::new(SongServiceConfig::default());
    let err = service
        .add_service(&Arc::new(RefusingRuntime { slots: 1 }))
        .unwrap_err();
    assert_eq!(err, ProfileError::Att(AttError::InsufficientResources));
    assert!(!service.is_registered());
    assert!(service.attribute_table().is_none());

    // A later attempt against a working runtime still succeeds
    let server = Arc::new(GattServer::new(
        GattServerConfig::default(),
        Arc::new(RecordingSink::default()),
    ));
    service.add_service(&server).unwrap();
    assert!(service.is_registered());
}

#[test]
fn test_accepted_registration_always_sticks() {
    let service = SongBurstService::new(SongServiceConfig::default());
    let runtime = Arc::new(SwappingRuntime::default());
    service.add_service(&runtime).unwrap();

    // The runtime holds our access entry points, so the service counts as registered
    assert!(service.is_registered());
    assert_eq!(service.value_handle(Parameter::Data), None);
    assert_eq!(service.add_service(&runtime), Err(ProfileError::AlreadyRegistered));

    let subscriptions = runtime
        .kept
        .lock()
        .unwrap()
        .as_ref()
        .and_then(|table| table.iter().find_map(Attribute::subscriptions).cloned())
        .unwrap();
    subscriptions.set(ConnHandle(1), ClientCharConfig::NOTIFY).unwrap();

    service.set_parameter(Parameter::Data, &[1; SONG_DATA_LEN]).unwrap();
    assert_eq!(service.notify_subscribers(), FanOut { sent: 0, failed: 1 });
}

#[test]
fn test_encryption_key_size_reaches_the_table() {
    let server = Arc::new(GattServer::new(
        GattServerConfig::default(),
        Arc::new(RecordingSink::default()),
    ));
    let service = SongBurstService::new(SongServiceConfig {
        encryption_key_size: 10,
        ..Default::default()
    });
    service.add_service(&server).unwrap();
    assert_eq!(service.attribute_table().unwrap().encryption_key_size(), 10);

    let too_short = SongBurstService::new(SongServiceConfig {
        encryption_key_size: 6,
        ..Default::default()
    });
    assert!(matches!(
        too_short.add_service(&server),
        Err(ProfileError::Att(AttError::InvalidParameter(_)))
    ));
}

#[test]
fn test_subscription_allocation_failure() {
    let service = SongBurstService::new(SongServiceConfig::default());
    let err = service
        .add_service(&Arc::new(RefusingRuntime { slots: usize::MAX }))
        .unwrap_err();
    assert_eq!(err, ProfileError::ResourceExhausted);
    assert_eq!(err.status(), crate::error::STATUS_MEM_ALLOC_ERROR);
    assert!(!service.is_registered());
}

#[test]
fn test_invalid_config_rejected() {
    let server = Arc::new(GattServer::new(
        GattServerConfig::default(),
        Arc::new(RecordingSink::default()),
    ));

    let clashing = SongBurstService::new(SongServiceConfig {
        config_id: SONG_DATA_ID,
        ..Default::default()
    });
    assert!(matches!(
        clashing.add_service(&server),
        Err(ProfileError::Att(AttError::InvalidParameter(_)))
    ));

    let reserved = SongBurstService::new(SongServiceConfig {
        data_id: CLIENT_CHAR_CONFIG_UUID,
        ..Default::default()
    });
    assert!(reserved.add_service(&server).is_err());
    assert!(server.services().is_empty());
}

#[test]
fn test_get_parameter() {
    let service = SongBurstService::new(SongServiceConfig::default());
    service.set_parameter(Parameter::Data, &pattern()).unwrap();
    service.set_parameter(Parameter::Config, &[3, 4]).unwrap();

    let mut data = [0u8; SONG_DATA_LEN];
    assert_eq!(service.get_parameter(Parameter::Data, &mut data), Ok(SONG_DATA_LEN));
    assert_eq!(data.to_vec(), pattern());

    let mut config = [0u8; 4];
    assert_eq!(service.get_parameter(Parameter::Config, &mut config), Ok(2));
    assert_eq!(config, [3, 4, 0, 0]);

    let mut short = [0u8; 100];
    assert_eq!(
        service.get_parameter(Parameter::Data, &mut short),
        Err(ProfileError::InvalidRange {
            expected: SONG_DATA_LEN,
            actual: 100
        })
    );
}

#[test]
fn test_parameter_ids() {
    assert_eq!(Parameter::try_from(0), Ok(Parameter::Data));
    assert_eq!(Parameter::try_from(1), Ok(Parameter::Config));
    let err = Parameter::try_from(2).unwrap_err();
    assert_eq!(err, ProfileError::UnknownParameter(2));
    assert_eq!(err.status(), crate::error::STATUS_INVALID_PARAMETER);
    assert_eq!(Parameter::Config.id(), 1);
}

#[test]
fn test_fan_out_skips_unsubscribed_and_counts_failures() {
    let (service, server, sink) = registered_with_sink(RecordingSink {
        refuse: Some(ConnHandle(3)),
        ..Default::default()
    });
    let cccd = service.cccd_handle().unwrap();
    let data_handle = service.value_handle(Parameter::Data).unwrap();

    for conn in [ConnHandle(1), ConnHandle(2), ConnHandle(3)] {
        server.connect(conn, ATT_MAX_MTU).unwrap();
    }
    server.write(ConnHandle(1), cccd, &[1, 0]).unwrap();
    server.write(ConnHandle(3), cccd, &[1, 0]).unwrap();

    let ones = [0xFFu8; SONG_DATA_LEN];
    service.set_parameter(Parameter::Data, &ones).unwrap();

    let sent = sink.sent.lock().unwrap().clone();
    assert_eq!(sent, vec![(ConnHandle(1), data_handle, ones.to_vec())]);
    assert_eq!(service.notify_subscribers(), FanOut { sent: 1, failed: 1 });
}

#[test]
fn test_fan_out_fits_default_mtu() {
    let (service, server, sink) = registered();
    let conn = ConnHandle(1);
    server.connect(conn, 23).unwrap();
    server.write(conn, service.cccd_handle().unwrap(), &[1, 0]).unwrap();

    let value = pattern();
    service.set_parameter(Parameter::Data, &value).unwrap();

    let sent = sink.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].2, value[..20].to_vec());
}

#[test]
fn test_readers_never_see_a_torn_burst() {
    let (service, _server, _sink) = registered();
    let data = attribute(&service, Parameter::Data);

    let writer = {
        let service = service.clone();
        thread::spawn(move || {
            for round in 0..2000 {
                let fill = if round % 2 == 0 { 0x00 } else { 0xFF };
                service.set_parameter(Parameter::Data, &[fill; SONG_DATA_LEN]).unwrap();
            }
        })
    };

    let mut out = [0u8; SONG_DATA_LEN];
    for _ in 0..2000 {
        let len = service
            .read_attribute(ConnHandle(1), &data, &mut out, 0, 378, AccessMethod::Read)
            .unwrap();
        assert_eq!(len, SONG_DATA_LEN);
        assert!(
            out.iter().all(|&b| b == out[0]),
            "mixed burst starting with {:#04x}",
            out[0]
        );
    }

    writer.join().unwrap();
}

#[test]
fn test_fan_out_before_registration_is_empty() {
    let service = SongBurstService::new(SongServiceConfig::default());
    service.set_parameter(Parameter::Data, &[1; SONG_DATA_LEN]).unwrap();
    assert_eq!(service.notify_subscribers(), FanOut::default());
}

#[test]
fn test_fan_out_after_runtime_dropped() {
    let (service, server, _sink) = registered();
    server.connect(ConnHandle(1), 23).unwrap();
    server
        .write(ConnHandle(1), service.cccd_handle().unwrap(), &[1, 0])
        .unwrap();
    drop(server);

    assert_eq!(service.notify_subscribers(), FanOut { sent: 0, failed: 1 });
    // The update itself still succeeds
    service.set_parameter(Parameter::Data, &[2; SONG_DATA_LEN]).unwrap();
    assert_eq!(service.data(), [2; SONG_DATA_LEN]);
}

#[test]
fn test_global_instance_is_shared() {
    let a = SongBurstService::global();
    let b = SongBurstService::global();
    assert!(Arc::ptr_eq(&a.state, &b.state));
    assert_eq!(a.config().service_id, SONG_SERVICE_ID);
}
