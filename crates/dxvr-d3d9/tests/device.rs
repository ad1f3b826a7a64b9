use std::sync::Arc;
use std::time::{Duration, Instant};

use ash::vk;
use dxvr_d3d9::{
    BackBufferType, CompletionMode, D3D9Device, D3D9Error, D3DFormat, DeviceConfig, LockFlags,
    MultiSampleType, SwapChainDesc, TextureDesc,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn deferred_device() -> Arc<D3D9Device> {
    init_logging();
    Arc::new(
        D3D9Device::new(DeviceConfig {
            completion: CompletionMode::Deferred,
            ..DeviceConfig::default()
        })
        .unwrap(),
    )
}

#[test]
fn wait_for_resource_submits_recorded_work_and_waits_for_it() {
    let device = deferred_device();
    let surface = device
        .create_render_target(64, 64, D3DFormat::A8R8G8B8, MultiSampleType::NONE)
        .unwrap();
    let texture = surface.common_texture();

    device.clear(&surface);
    let seq = texture.mapping_buffer_sequence_number(0);
    assert_eq!(seq, device.command_stream().recording_sequence());
    assert_eq!(device.gpu_device().timeline().last_submitted(), 0);

    let gpu = {
        let device = device.clone();
        std::thread::spawn(move || {
            let timeline = device.gpu_device().timeline();
            while timeline.last_submitted() == 0 {
                std::thread::sleep(Duration::from_millis(1));
            }
            std::thread::sleep(Duration::from_millis(20));
            timeline.retire_all();
        })
    };

    assert!(device.wait_for_resource(texture.image(), seq, LockFlags::READONLY));
    let timeline = device.gpu_device().timeline();
    assert!(timeline.is_retired(texture.image().last_write()));
    assert!(texture.image().last_write() > 0);
    gpu.join().unwrap();
}

#[test]
fn donotwait_reports_busy_resources() {
    let device = deferred_device();
    let surface = device
        .create_render_target(8, 8, D3DFormat::A8B8G8R8, MultiSampleType::NONE)
        .unwrap();
    let texture = surface.common_texture();

    device.clear(&surface);
    let seq = texture.mapping_buffer_sequence_number(0);
    assert!(!device.wait_for_resource(
        texture.image(),
        seq,
        LockFlags::READONLY | LockFlags::DONOTWAIT
    ));

    device.gpu_device().timeline().retire_all();
    assert!(device.wait_for_resource(
        texture.image(),
        seq,
        LockFlags::READONLY | LockFlags::DONOTWAIT
    ));
}

#[test]
fn untouched_resources_do_not_flush() {
    let device = deferred_device();
    let other = device
        .create_render_target(8, 8, D3DFormat::A8R8G8B8, MultiSampleType::NONE)
        .unwrap();
    let idle = device
        .create_render_target(8, 8, D3DFormat::A8R8G8B8, MultiSampleType::NONE)
        .unwrap();

    device.clear(&other);
    assert!(device.wait_for_resource(idle.common_texture().image(), 0, LockFlags::READONLY));
    assert_eq!(device.command_stream().recorded_commands(), 2);
    assert_eq!(device.gpu_device().timeline().last_submitted(), 0);
}

#[test]
fn device_lock_blocks_submission_from_other_threads() {
    let device = deferred_device();
    let surface = device
        .create_render_target(8, 8, D3DFormat::A8R8G8B8, MultiSampleType::NONE)
        .unwrap();

    let guard = device.lock_device();

    let submitter = {
        let device = device.clone();
        let surface = surface.clone();
        std::thread::spawn(move || {
            device.clear(&surface);
            device.flush();
            Instant::now()
        })
    };

    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(device.command_stream().recorded_commands(), 0);
    let released_at = Instant::now();
    drop(guard);

    let submitted_at = submitter.join().unwrap();
    assert!(submitted_at >= released_at);
    assert_eq!(device.command_stream().queued_chunks(), 1);
}

#[test]
fn lock_holder_can_keep_using_the_device() {
    let device = deferred_device();
    let surface = device
        .create_render_target(8, 8, D3DFormat::A8R8G8B8, MultiSampleType::NONE)
        .unwrap();

    let _guard = device.lock_device();
    device.clear(&surface);
    device.flush();
    device.synchronize_cs_thread();
    assert_eq!(device.gpu_device().timeline().last_submitted(), 1);
}

#[test]
fn get_back_buffer_validates_arguments() {
    init_logging();
    let device = D3D9Device::new(DeviceConfig {
        swap_chain: Some(SwapChainDesc {
            back_buffer_count: 2,
            ..SwapChainDesc::new(1920, 1080, D3DFormat::A8R8G8B8)
        }),
        ..DeviceConfig::default()
    })
    .unwrap();

    let first = device.get_back_buffer(0, 0, BackBufferType::Mono).unwrap();
    assert_eq!((first.width(), first.height()), (1920, 1080));
    assert!(device.get_back_buffer(0, 1, BackBufferType::Mono).is_ok());

    for (swap_chain, index, kind) in [
        (0, 2, BackBufferType::Mono),
        (1, 0, BackBufferType::Mono),
        (0, 0, BackBufferType::Left),
        (0, 0, BackBufferType::Right),
    ] {
        let err = device.get_back_buffer(swap_chain, index, kind).unwrap_err();
        assert!(matches!(err, D3D9Error::InvalidCall(_)), "unexpected error: {err:?}");
        assert_eq!(err.hresult(), dxvr_d3d9::D3DERR_INVALIDCALL);
    }
}

#[test]
fn present_rotates_back_buffers() {
    init_logging();
    let device = D3D9Device::new(DeviceConfig {
        swap_chain: Some(SwapChainDesc {
            back_buffer_count: 2,
            ..SwapChainDesc::default()
        }),
        ..DeviceConfig::default()
    })
    .unwrap();

    let before = device.get_back_buffer(0, 0, BackBufferType::Mono).unwrap();
    let second = device.get_back_buffer(0, 1, BackBufferType::Mono).unwrap();
    device.present().unwrap();
    device.synchronize_cs_thread();

    let after = device.get_back_buffer(0, 0, BackBufferType::Mono).unwrap();
    assert_eq!(
        after.common_texture().image().handle(),
        second.common_texture().image().handle()
    );
    let presented = before.common_texture().image();
    assert_eq!(presented.layout(), vk::ImageLayout::PRESENT_SRC_KHR);
    assert!(presented.last_read() > 0);
}

#[test]
fn reset_reallocates_back_buffer_images() {
    init_logging();
    let device = D3D9Device::new(DeviceConfig::default()).unwrap();
    let old = device.get_back_buffer(0, 0, BackBufferType::Mono).unwrap();

    device
        .reset(SwapChainDesc::new(2560, 1440, D3DFormat::A8R8G8B8))
        .unwrap();
    let new = device.get_back_buffer(0, 0, BackBufferType::Mono).unwrap();

    assert_ne!(
        old.common_texture().image().handle(),
        new.common_texture().image().handle()
    );
    assert_eq!((new.width(), new.height()), (2560, 1440));
    assert_eq!(device.swap_chain_desc(0).unwrap().width, 2560);
}

#[test]
fn devices_without_swap_chain_cannot_present() {
    init_logging();
    let device = D3D9Device::new(DeviceConfig {
        swap_chain: None,
        ..DeviceConfig::default()
    })
    .unwrap();
    assert!(device.get_back_buffer(0, 0, BackBufferType::Mono).is_err());
    assert!(device.present().is_err());

    device
        .reset(SwapChainDesc::new(640, 480, D3DFormat::X8R8G8B8))
        .unwrap();
    assert!(device.get_back_buffer(0, 0, BackBufferType::Mono).is_ok());
}

#[test]
fn multisampled_resolve_reuses_one_image() {
    init_logging();
    let device = D3D9Device::new(DeviceConfig::default()).unwrap();
    let surface = device
        .create_render_target(32, 32, D3DFormat::A8R8G8B8, MultiSampleType::samples(4))
        .unwrap();
    let texture = surface.common_texture();

    let first = device.resolve_texture(texture);
    let second = device.resolve_texture(texture);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.info().sample_count, vk::SampleCountFlags::TYPE_1);
    assert_eq!(first.layout(), vk::ImageLayout::TRANSFER_SRC_OPTIMAL);

    device.flush();
    device.synchronize_cs_thread();
    assert!(first.last_write() > 0);
    assert!(texture.image().last_read() > 0);
}

#[test]
fn transitions_over_remaining_layers_track_every_layer_from_the_base() {
    let device = deferred_device();
    let texture = device
        .create_texture(TextureDesc {
            array_layers: 4,
            ..TextureDesc::render_target(
                16,
                16,
                D3DFormat::A8R8G8B8,
                MultiSampleType::NONE,
            )
        })
        .unwrap();

    let range = vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: vk::REMAINING_MIP_LEVELS,
        base_array_layer: 1,
        layer_count: vk::REMAINING_ARRAY_LAYERS,
    };
    device.transform_image(
        &texture,
        &range,
        vk::ImageLayout::UNDEFINED,
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
    );

    let seq = device.command_stream().recording_sequence();
    assert_eq!(texture.image().layout(), vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
    assert_eq!(texture.mapping_buffer_sequence_number(0), 0);
    for layer in 1..4 {
        assert_eq!(
            texture.mapping_buffer_sequence_number(texture.subresource_index(layer, 0)),
            seq
        );
    }
}
