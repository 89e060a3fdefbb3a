//! Example running the song burst service on the in-process GATT server
//!
//! A stand-in transport prints every notification. One simulated peer
//! subscribes to the song data and rewrites the configuration value while the
//! application publishes a few bursts.

use std::sync::Arc;

use songburst::{
    AttResult, ConnHandle, GattServer, GattServerConfig, NotificationSink, Parameter,
    SongBurstService, SONG_DATA_LEN,
};

struct PrintingTransport;

impl NotificationSink for PrintingTransport {
    fn send_notification(&self, conn: ConnHandle, handle: u16, value: &[u8]) -> AttResult<()> {
        println!(
            "-> {} handle {:#06x}: {} bytes, starts {}",
            conn,
            handle,
            value.len(),
            hex::encode(&value[..value.len().min(8)])
        );
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let server = Arc::new(GattServer::new(
        GattServerConfig::default(),
        Arc::new(PrintingTransport),
    ));

    let service = SongBurstService::global();
    service.register_callbacks(Some(Arc::new(|param: Parameter| {
        println!("Application notified: {} changed", param);
    })))?;
    service.add_service(&server)?;

    let data = service.value_handle(Parameter::Data).ok_or("song data not registered")?;
    let config = service.value_handle(Parameter::Config).ok_or("config not registered")?;
    let cccd = service.cccd_handle().ok_or("no CCCD registered")?;
    println!(
        "Song data at {:#06x} (CCCD {:#06x}), config at {:#06x}",
        data, cccd, config
    );

    // Simulated peer
    let peer = ConnHandle(0x0040);
    server.connect(peer, 23)?;
    server.write(peer, cccd, &[0x01, 0x00])?;

    for burst in 0..3u8 {
        let song = [burst; SONG_DATA_LEN];
        service.set_parameter(Parameter::Data, &song)?;
    }

    server.write(peer, config, &[0x02, 0x01])?;
    println!("Config is now {}", hex::encode(service.config_value()));

    let first = server.read(peer, data)?;
    let tail = server.read_blob(peer, data, (SONG_DATA_LEN - 4) as u16)?;
    println!(
        "Peer read {} bytes, then {} trailing bytes",
        first.len(),
        tail.len()
    );

    server.disconnect(peer);
    Ok(())
}
