use vergen::EmitBuilder;

fn main() {
    // 生成构建信息，git 不可用时 vergen 会输出默认值
    if let Err(e) = EmitBuilder::builder().all_build().all_git().emit() {
        println!("cargo:warning=无法生成构建信息: {}", e);
    }
}
