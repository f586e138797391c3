use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const LIB_NAME: &str = "omt";

fn main() {
	let crate_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
	let version = env::var("CARGO_PKG_VERSION").unwrap();
	let target_dir = target_dir();

	println!("cargo:rerun-if-changed=src");
	println!("cargo:rerun-if-changed=cbindgen.toml");
	println!("cargo:rerun-if-changed={}.pc.in", LIB_NAME);

	// Generate C header into target/include/
	let include_dir = target_dir.join("include");
	fs::create_dir_all(&include_dir).expect("Failed to create include directory");
	let header = include_dir.join(format!("{}.h", LIB_NAME));
	cbindgen::Builder::new()
		.with_config(config(Path::new(&crate_dir)))
		.with_crate(&crate_dir)
		.generate()
		.expect("Unable to generate bindings")
		.write_to_file(&header);

	// Generate pkg-config file into target/pkgconfig/
	let pc_in = PathBuf::from(&crate_dir).join(format!("{}.pc.in", LIB_NAME));
	let pkgconfig_dir = target_dir.join("pkgconfig");
	fs::create_dir_all(&pkgconfig_dir).expect("Failed to create pkgconfig directory");
	let pc_out = pkgconfig_dir.join(format!("{}.pc", LIB_NAME));
	if let Ok(template) = fs::read_to_string(&pc_in) {
		let target = env::var("TARGET").unwrap();
		let libs_private = if target.contains("apple") {
			"-framework CoreFoundation"
		} else if target.contains("windows") {
			"-lws2_32 -luserenv -lntdll"
		} else {
			"-ldl -lm -lpthread"
		};

		let content = template
			.replace("@VERSION@", &version)
			.replace("@LIBS_PRIVATE@", libs_private);
		fs::write(&pc_out, content).expect("Failed to write pkg-config file");
	}
}

fn config(crate_dir: &Path) -> cbindgen::Config {
	let path = crate_dir.join("cbindgen.toml");
	let mut config = match path.exists() {
		true => cbindgen::Config::from_file(&path).expect("Invalid cbindgen.toml"),
		false => cbindgen::Config::default(),
	};
	config.language = cbindgen::Language::C;
	config
}

fn target_dir() -> PathBuf {
	// OUT_DIR is target/{profile}/build/{crate}-{hash}/out, with {target}/ after target/ when cross compiling.
	// Four levels up is target/ or target/{target}/
	PathBuf::from(env::var("OUT_DIR").unwrap())
		.parent()
		.and_then(|p| p.parent())
		.and_then(|p| p.parent())
		.and_then(|p| p.parent())
		.expect("Failed to get target directory from OUT_DIR")
		.to_path_buf()
}
