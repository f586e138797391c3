use std::ffi::{c_char, c_int, c_void, CStr, CString};

use omt::*;

// Every test shares the process-wide context, so each one publishes under its own name.

const VIDEO: c_int = OMTFrameType::Video as c_int;
const AUDIO: c_int = OMTFrameType::Audio as c_int;
const METADATA: c_int = OMTFrameType::Metadata as c_int;
const ALL: c_int = VIDEO | AUDIO | METADATA;

fn create_sender(name: &str) -> *mut omt_send_t {
	let name = CString::new(name).unwrap();
	let sender = unsafe { omt_send_create(name.as_ptr(), 0) };
	assert!(!sender.is_null());
	sender
}

fn address(sender: *mut omt_send_t) -> CString {
	let len = unsafe { omt_send_getaddress(sender, std::ptr::null_mut(), 0) };
	assert!(len > 1);

	// The buffer must be strictly larger than the required length.
	assert_eq!(unsafe { omt_send_getaddress(sender, vec![0; len as usize].as_mut_ptr(), len) }, 0);

	let mut buf = vec![0 as c_char; len as usize + 1];
	assert_eq!(unsafe { omt_send_getaddress(sender, buf.as_mut_ptr(), len + 1) }, len);
	unsafe { CStr::from_ptr(buf.as_ptr()) }.to_owned()
}

fn connect(sender: *mut omt_send_t, frame_types: c_int) -> *mut omt_receive_t {
	let address = address(sender);
	let receiver = unsafe { omt_receive_create(address.as_ptr(), frame_types, 0, 0) };
	assert!(!receiver.is_null());
	receiver
}

fn metadata(xml: &CStr) -> OMTMediaFrame {
	OMTMediaFrame {
		frame_type: METADATA,
		timestamp: -1,
		data: xml.as_ptr().cast_mut().cast(),
		data_length: xml.to_bytes_with_nul().len() as c_int,
		..Default::default()
	}
}

fn last_error() -> String {
	let mut buf = [0 as c_char; 512];
	let len = unsafe { omt_last_error(buf.as_mut_ptr(), buf.len() as c_int) };
	assert!(len > 0);
	unsafe { CStr::from_ptr(buf.as_ptr()) }.to_string_lossy().into_owned()
}

#[test]
fn video_roundtrip() {
	let sender = create_sender("api video");
	let receiver = connect(sender, VIDEO);
	assert_eq!(unsafe { omt_send_connections(sender) }, 1);

	let pixels = vec![0x80u8; 8 * 2];
	let frame = OMTMediaFrame {
		frame_type: VIDEO,
		timestamp: 1000,
		codec: OMTCodec::UYVY as c_int,
		width: 4,
		height: 2,
		stride: 8,
		frame_rate_n: 60000,
		frame_rate_d: 1001,
		aspect_ratio: 16.0 / 9.0,
		color_space: OMTColorSpace::BT709 as c_int,
		data: pixels.as_ptr().cast_mut().cast::<c_void>(),
		data_length: pixels.len() as c_int,
		..Default::default()
	};
	assert_eq!(unsafe { omt_send(sender, &frame) }, pixels.len() as c_int);

	let received = unsafe { omt_receive(receiver, VIDEO, 100) };
	assert!(!received.is_null());

	let received = unsafe { &*received };
	assert_eq!(received.frame_type, VIDEO);
	assert_eq!(received.timestamp, 1000);
	assert_eq!((received.width, received.height, received.stride), (4, 2, 8));
	assert_eq!(received.data_length, pixels.len() as c_int);
	let data = unsafe { std::slice::from_raw_parts(received.data.cast::<u8>(), received.data_length as usize) };
	assert_eq!(data, &pixels[..]);

	let mut stats = OMTStatistics::default();
	unsafe { omt_receive_getvideostatistics(receiver, &mut stats) };
	assert_eq!(stats.frames, 1);
	assert_eq!(stats.bytes_received, pixels.len() as i64);
	assert_eq!(stats.codec_time, 0);

	unsafe { omt_send_getvideostatistics(sender, &mut stats) };
	assert_eq!(stats.frames, 1);

	unsafe { omt_receive_destroy(receiver) };
	assert_eq!(unsafe { omt_send_connections(sender) }, 0);
	unsafe { omt_send_destroy(sender) };
}

#[test]
fn receive_times_out() {
	let sender = create_sender("api timeout");
	let receiver = connect(sender, ALL);

	let started = std::time::Instant::now();
	assert!(unsafe { omt_receive(receiver, VIDEO, 50) }.is_null());
	assert!(started.elapsed() >= std::time::Duration::from_millis(40));

	unsafe { omt_receive_destroy(receiver) };
	unsafe { omt_send_destroy(sender) };
}

#[test]
fn metadata_both_ways() {
	let sender = create_sender("api metadata");
	let receiver = connect(sender, METADATA);

	let hello = c"<hello/>";
	assert!(unsafe { omt_send(sender, &metadata(hello)) } > 0);

	let received = unsafe { omt_receive(receiver, METADATA, 100) };
	assert!(!received.is_null());
	let xml = unsafe { CStr::from_ptr((*received).data.cast()) };
	assert_eq!(xml, hello);
	assert_eq!(unsafe { (*received).data_length }, hello.to_bytes_with_nul().len() as c_int);

	let reply = c"<reply/>";
	assert!(unsafe { omt_receive_send(receiver, &metadata(reply)) } > 0);

	let received = unsafe { omt_send_receive(sender, 100) };
	assert!(!received.is_null());
	assert_eq!(unsafe { CStr::from_ptr((*received).data.cast()) }, reply);

	// Only metadata goes back to a sender.
	let pixels = [0u8; 4];
	let video = OMTMediaFrame {
		frame_type: VIDEO,
		width: 1,
		height: 1,
		stride: 4,
		data: pixels.as_ptr().cast_mut().cast(),
		data_length: 4,
		..Default::default()
	};
	assert_eq!(unsafe { omt_receive_send(receiver, &video) }, 0);

	unsafe { omt_receive_destroy(receiver) };
	unsafe { omt_send_destroy(sender) };
}

#[test]
fn connection_metadata_on_connect() {
	let sender = create_sender("api connection metadata");
	let xml = c"<settings quality=\"high\"/>";
	unsafe { omt_send_addconnectionmetadata(sender, xml.as_ptr()) };
	// Null is ignored.
	unsafe { omt_send_addconnectionmetadata(sender, std::ptr::null()) };

	let receiver = connect(sender, METADATA);
	let received = unsafe { omt_receive(receiver, METADATA, 100) };
	assert!(!received.is_null());
	assert_eq!(unsafe { CStr::from_ptr((*received).data.cast()) }, xml);

	unsafe { omt_send_clearconnectionmetadata(sender) };
	let late = connect(sender, METADATA);
	assert!(unsafe { omt_receive(late, METADATA, 0) }.is_null());

	unsafe { omt_receive_destroy(late) };
	unsafe { omt_receive_destroy(receiver) };
	unsafe { omt_send_destroy(sender) };
}

#[test]
fn tally() {
	let sender = create_sender("api tally");
	let receiver = connect(sender, VIDEO);

	let on_air = OMTTally { preview: 0, program: 1 };
	unsafe { omt_receive_settally(receiver, &on_air) };
	unsafe { omt_receive_settally(receiver, std::ptr::null()) };

	let mut tally = OMTTally::default();
	assert_eq!(unsafe { omt_send_gettally(sender, 100, &mut tally) }, 1);
	assert_eq!(tally, on_air);

	// Unchanged since the last call.
	assert_eq!(unsafe { omt_send_gettally(sender, 0, &mut tally) }, 0);
	assert_eq!(tally, on_air);

	unsafe { omt_receive_destroy(receiver) };
	assert_eq!(unsafe { omt_send_gettally(sender, 100, &mut tally) }, 1);
	assert_eq!(tally, OMTTally::default());

	unsafe { omt_send_destroy(sender) };
}

#[test]
fn receive_tally_requires_output() {
	let sender = create_sender("api tally output");
	let receiver = connect(sender, VIDEO);

	let started = std::time::Instant::now();
	assert_eq!(unsafe { omt_receive_gettally(receiver, 200, std::ptr::null_mut()) }, 0);
	assert!(started.elapsed() < std::time::Duration::from_millis(100));
	assert!(last_error().contains("invalid pointer"));

	unsafe { omt_receive_destroy(receiver) };
	unsafe { omt_send_destroy(sender) };
}

#[test]
fn receivers_own_their_frames() {
	let sender = create_sender("api private frames");
	let first = connect(sender, VIDEO);
	let second = connect(sender, VIDEO);

	let pixels = [0x10u8; 16];
	let frame = OMTMediaFrame {
		frame_type: VIDEO,
		codec: OMTCodec::BGRA as c_int,
		width: 2,
		height: 2,
		stride: 8,
		data: pixels.as_ptr().cast_mut().cast::<c_void>(),
		data_length: pixels.len() as c_int,
		..Default::default()
	};
	assert_eq!(unsafe { omt_send(sender, &frame) }, 16);

	let a = unsafe { omt_receive(first, VIDEO, 100) };
	let b = unsafe { omt_receive(second, VIDEO, 100) };
	assert!(!a.is_null() && !b.is_null());

	let (a, b) = unsafe { (&*a, &*b) };
	assert_ne!(a.data, b.data);

	// A caller scribbling over its frame leaves every other receiver alone.
	unsafe { std::ptr::write_bytes(a.data.cast::<u8>(), 0xff, 16) };
	let b = unsafe { std::slice::from_raw_parts(b.data.cast::<u8>(), 16) };
	assert_eq!(b, &pixels[..]);

	unsafe { omt_receive_destroy(first) };
	unsafe { omt_receive_destroy(second) };
	unsafe { omt_send_destroy(sender) };
}

#[test]
fn sender_information() {
	let sender = create_sender("api info");
	let receiver = connect(sender, VIDEO);

	let mut info: Box<OMTSenderInfo> = Box::new(unsafe { std::mem::zeroed() });
	unsafe { omt_receive_getsenderinformation(receiver, info.as_mut()) };
	assert_eq!(info.product_name[0], 0);

	for (dst, src) in info.product_name.iter_mut().zip(b"Switcher\0") {
		*dst = *src as c_char;
	}
	for (dst, src) in info.version.iter_mut().zip(b"1.0\0") {
		*dst = *src as c_char;
	}
	unsafe { omt_send_setsenderinformation(sender, info.as_ref()) };

	let mut read: Box<OMTSenderInfo> = Box::new(unsafe { std::mem::zeroed() });
	unsafe { omt_receive_getsenderinformation(receiver, read.as_mut()) };
	assert_eq!(unsafe { CStr::from_ptr(read.product_name.as_ptr()) }, c"Switcher");
	assert_eq!(unsafe { CStr::from_ptr(read.version.as_ptr()) }, c"1.0");

	unsafe { omt_receive_destroy(receiver) };
	unsafe { omt_send_destroy(sender) };
}

#[test]
fn discovery() {
	let sender = create_sender("api discovery");
	let expected = address(sender);

	let mut count: c_int = 0;
	let first = unsafe { omt_discovery_getaddresses(&mut count) };
	assert!(!first.is_null());
	assert!(count >= 1);

	let addresses: Vec<&CStr> = (0..count as usize)
		.map(|i| unsafe { CStr::from_ptr(*first.add(i)) })
		.collect();
	assert!(addresses.contains(&expected.as_c_str()));

	// A second call replaces the first list.
	let second = unsafe { omt_discovery_getaddresses(&mut count) };
	assert!(!second.is_null());

	assert!(unsafe { omt_discovery_getaddresses(std::ptr::null_mut()) }.is_null());

	unsafe { omt_send_destroy(sender) };
}

#[test]
fn redirect() {
	let target = create_sender("api redirect target");
	let source = create_sender("api redirect source");

	let target_address = address(target);
	unsafe { omt_send_setredirect(source, target_address.as_ptr()) };

	let receiver = connect(source, VIDEO);
	assert_eq!(unsafe { omt_send_connections(target) }, 1);
	assert_eq!(unsafe { omt_send_connections(source) }, 0);

	unsafe { omt_send_setredirect(source, c"".as_ptr()) };
	unsafe { omt_send_setredirect(source, std::ptr::null()) };

	unsafe { omt_receive_destroy(receiver) };
	unsafe { omt_send_destroy(source) };
	unsafe { omt_send_destroy(target) };
}

#[test]
fn stale_handles_are_neutral() {
	let sender = create_sender("api stale");
	unsafe { omt_send_destroy(sender) };

	assert_eq!(unsafe { omt_send_connections(sender) }, 0);
	assert_eq!(unsafe { omt_send_getaddress(sender, std::ptr::null_mut(), 0) }, 0);
	assert!(unsafe { omt_send_receive(sender, 0) }.is_null());
	assert!(last_error().contains("not found"));

	// Destroying twice is harmless.
	unsafe { omt_send_destroy(sender) };

	assert_eq!(unsafe { omt_send_connections(std::ptr::null_mut()) }, 0);
	assert!(unsafe { omt_receive(std::ptr::null_mut(), ALL, 0) }.is_null());
	assert!(last_error().contains("invalid handle"));
}

#[test]
fn wrong_handle_kind() {
	let sender = create_sender("api wrong kind");
	let receiver = connect(sender, VIDEO);

	let as_receiver = sender.cast::<omt_receive_t>();
	assert!(unsafe { omt_receive(as_receiver, ALL, 0) }.is_null());
	assert!(last_error().contains("wrong type"));

	// The handle survives a mismatched destroy.
	unsafe { omt_receive_destroy(as_receiver) };
	assert_eq!(unsafe { omt_send_connections(sender) }, 1);

	let as_sender = receiver.cast::<omt_send_t>();
	assert_eq!(unsafe { omt_send_connections(as_sender) }, 0);

	unsafe { omt_receive_destroy(receiver) };
	unsafe { omt_send_destroy(sender) };
}

#[test]
fn invalid_frames_are_rejected() {
	let sender = create_sender("api invalid frame");

	assert_eq!(unsafe { omt_send(sender, std::ptr::null()) }, 0);

	let unknown = OMTMediaFrame {
		frame_type: 3,
		..Default::default()
	};
	assert_eq!(unsafe { omt_send(sender, &unknown) }, 0);
	assert!(last_error().contains("unknown frame type"));

	let audio = OMTMediaFrame {
		frame_type: AUDIO,
		codec: OMTCodec::FPA1 as c_int,
		sample_rate: 48000,
		channels: 2,
		samples_per_channel: 1024,
		data_length: 16,
		..Default::default()
	};
	// A length without a buffer.
	assert_eq!(unsafe { omt_send(sender, &audio) }, 0);

	unsafe { omt_send_destroy(sender) };
}

#[test]
fn settings() {
	let name = c"ApiTestString";
	unsafe { omt_settings_set_string(name.as_ptr(), c"value".as_ptr()) };

	let len = unsafe { omt_settings_get_string(name.as_ptr(), std::ptr::null_mut(), 0) };
	assert_eq!(len, 6);

	let mut buf = [0 as c_char; 6];
	assert_eq!(unsafe { omt_settings_get_string(name.as_ptr(), buf.as_mut_ptr(), 6) }, 0);

	let mut buf = [0 as c_char; 16];
	assert_eq!(unsafe { omt_settings_get_string(name.as_ptr(), buf.as_mut_ptr(), 16) }, 6);
	assert_eq!(unsafe { CStr::from_ptr(buf.as_ptr()) }, c"value");

	assert_eq!(unsafe { omt_settings_get_string(c"Missing".as_ptr(), buf.as_mut_ptr(), 16) }, 0);

	let number = c"ApiTestInteger";
	unsafe { omt_settings_set_integer(number.as_ptr(), 42) };
	assert_eq!(unsafe { omt_settings_get_integer(number.as_ptr()) }, 42);
	assert_eq!(unsafe { omt_settings_get_integer(c"Missing".as_ptr()) }, 0);

	assert!(unsafe { omt_settings_get_integer(c"NetworkPortStart".as_ptr()) } > 0);
}

#[test]
fn logging() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("api.log");
	let filename = CString::new(path.to_str().unwrap()).unwrap();

	unsafe { omt_setloggingfilename(filename.as_ptr()) };
	assert_eq!(unsafe { omt_setloglevel(c"debug".as_ptr()) }, 1);
	assert_eq!(unsafe { omt_setloglevel(c"omt=nonsense".as_ptr()) }, 0);

	// A URL without a port fails, and is logged at error level.
	assert!(unsafe { omt_receive_create(c"omt://nowhere".as_ptr(), ALL, 0, 0) }.is_null());

	let contents = std::fs::read_to_string(&path).unwrap();
	assert!(contents.contains("omt_receive_create"));

	unsafe { omt_setloggingfilename(std::ptr::null()) };
	assert_eq!(unsafe { omt_setloglevel(c"info".as_ptr()) }, 1);
}
