use std::process::Command;

fn main() {
    let commit = run(&["git", "rev-parse", "--short", "HEAD"]);
    // 构建时间（UTC），不为 build script 引入 chrono
    let build_time = run(&["date", "-u", "+%Y-%m-%dT%H:%M:%SZ"]);
    let target = std::env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=CAUSEWAY_GIT_COMMIT={commit}");
    println!("cargo:rustc-env=CAUSEWAY_BUILD_TIME={build_time}");
    println!("cargo:rustc-env=CAUSEWAY_BUILD_TARGET={target}");
    println!("cargo:rustc-env=CAUSEWAY_BUILD_PROFILE={profile}");

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    // sqlx::migrate! 在编译期嵌入迁移文件
    println!("cargo:rerun-if-changed=migrations");
}

/// 执行命令并返回去除首尾空白的 stdout，失败时返回 "unknown"
fn run(args: &[&str]) -> String {
    let Some((program, rest)) = args.split_first() else {
        return "unknown".to_string();
    };
    Command::new(program)
        .args(rest)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
